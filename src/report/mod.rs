use std::io;

use crate::core::{Projection, Strategy, Trajectory};

const COLUMN_WIDTH: usize = 14;

struct Column<'a> {
    header: &'static str,
    trajectory: &'a Trajectory,
}

fn columns(projection: &Projection) -> Vec<Column<'_>> {
    let hold = &projection.hold;
    let rebuy = &projection.rebuy;
    [
        ("hold_gross", hold.gross.as_ref()),
        ("hold_net", Some(&hold.net)),
        ("hold_real", hold.real.as_ref()),
        ("rebuy_gross", rebuy.gross.as_ref()),
        ("rebuy_net", Some(&rebuy.net)),
        ("rebuy_real", rebuy.real.as_ref()),
    ]
    .into_iter()
    .filter_map(|(header, trajectory)| trajectory.map(|trajectory| Column { header, trajectory }))
    .collect()
}

pub fn write_csv<W: io::Write>(projection: &Projection, writer: W) -> Result<(), csv::Error> {
    let columns = columns(projection);
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["year"];
    header.extend(columns.iter().map(|c| c.header));
    csv.write_record(&header)?;

    for &year in &projection.years {
        let mut record = vec![year.to_string()];
        record.extend(columns.iter().map(|c| {
            c.trajectory
                .value_at(year)
                .map(|v| format!("{v:.2}"))
                .unwrap_or_default()
        }));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn render_table(projection: &Projection) -> String {
    let columns = columns(projection);
    let mut out = String::new();

    out.push_str(&format!("{:>6}", "year"));
    for column in &columns {
        out.push_str(&format!("{:>COLUMN_WIDTH$}", column.header));
    }
    out.push('\n');

    for &year in &projection.years {
        let marker = if year == projection.sale_year || year == projection.sell_rebuy_year {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("{year:>5}{marker}"));
        for column in &columns {
            match column.trajectory.value_at(year) {
                Some(value) => out.push_str(&format!("{value:>COLUMN_WIDTH$.2}")),
                None => out.push_str(&format!("{:>COLUMN_WIDTH$}", "")),
            }
        }
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&render_summary(projection));
    out
}

pub fn render_summary(projection: &Projection) -> String {
    let hold = &projection.hold_breakdown;
    let rebuy = &projection.rebuy_breakdown;
    let summary = &projection.summary;
    let mut lines = vec![
        format!(
            "Hold: sell in {} | gain {:.2} | tax {:.2} | net now {:.2}",
            projection.sale_year, hold.gain, hold.tax_paid, hold.net_value_now
        ),
        format!(
            "Sell & Rebuy: sell in {} | gain {:.2} | tax {:.2} | new basis {:.2}",
            projection.sell_rebuy_year, rebuy.gain, rebuy.tax_paid, rebuy.after_tax_basis
        ),
        format!(
            "Sell & Rebuy final sale: gross {:.2} | new gain {:.2} | tax {:.2} | net {:.2}",
            rebuy.final_gross, rebuy.final_gain, rebuy.final_tax, rebuy.final_net
        ),
        format!(
            "{}: hold {:.2} vs sell & rebuy {:.2} (difference {:+.2})",
            summary.final_year, summary.hold_final_net, summary.rebuy_final_net, summary.net_advantage
        ),
    ];
    if let (Some(hold_real), Some(rebuy_real), Some(advantage)) = (
        summary.hold_final_real,
        summary.rebuy_final_real,
        summary.real_advantage,
    ) {
        let anchor = projection
            .discount_anchor_year
            .map(|year| format!(" in {year} money"))
            .unwrap_or_default();
        lines.push(format!(
            "{} real{anchor}: hold {hold_real:.2} vs sell & rebuy {rebuy_real:.2} (difference {advantage:+.2})",
            summary.final_year
        ));
    }
    lines.push(format!("Preferred: {}", strategy_label(summary.preferred)));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Hold => "hold",
        Strategy::SellAndRebuy => "sell & rebuy",
        Strategy::Tie => "either (tie)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        DEFAULT_SALE_YEAR, DEFAULT_START_YEAR, DiscountAnchor, ProjectionOptions, ScenarioInputs,
        run_projection,
    };

    fn sample_projection(options: ProjectionOptions) -> Projection {
        let inputs = ScenarioInputs {
            purchase_price: 10_000.0,
            current_value: 50_000.0,
            sell_rebuy_year: 2015,
            sell_rebuy_value: 40_000.0,
            tax_rate: 0.26375,
            annual_return: 0.05,
            annual_inflation: 0.02,
            years_to_future: 5,
            start_year: DEFAULT_START_YEAR,
            sale_year: DEFAULT_SALE_YEAR,
        };
        run_projection(&inputs, &options).expect("valid projection")
    }

    fn csv_lines(projection: &Projection) -> Vec<String> {
        let mut buf = Vec::new();
        write_csv(projection, &mut buf).expect("csv should write");
        String::from_utf8(buf)
            .expect("utf8")
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn csv_has_header_and_one_row_per_year() {
        let lines = csv_lines(&sample_projection(ProjectionOptions::default()));
        assert_eq!(
            lines[0],
            "year,hold_gross,hold_net,hold_real,rebuy_gross,rebuy_net,rebuy_real"
        );
        assert_eq!(lines.len(), 1 + 26);
        assert_eq!(lines[1], "2005,10000.00,10000.00,10000.00,,,");
        assert!(lines[21].starts_with("2025,50000.00,39450.00,39450.00,"));
    }

    #[test]
    fn csv_headers_follow_present_series() {
        let projection = sample_projection(ProjectionOptions {
            inflation_adjusted: false,
            include_gross: false,
            discount_anchor: DiscountAnchor::default(),
        });
        let lines = csv_lines(&projection);
        assert_eq!(lines[0], "year,hold_net,rebuy_net");
        assert_eq!(lines[11], "2015,30000.00,32087.50");
    }

    #[test]
    fn table_marks_event_years_and_ends_with_summary() {
        let table = render_table(&sample_projection(ProjectionOptions::default()));
        assert!(table.contains(" 2015*"));
        assert!(table.contains(" 2025*"));
        assert!(table.contains(" 2016 "));
        assert!(table.contains("net now 39450.00"));
        assert!(table.contains("new basis 32087.50"));
        assert!(table.contains("in 2025 money"));
        assert!(table.trim_end().ends_with("Preferred: sell & rebuy"));
    }

    #[test]
    fn summary_skips_real_line_without_inflation() {
        let summary = render_summary(&sample_projection(ProjectionOptions {
            inflation_adjusted: false,
            ..ProjectionOptions::default()
        }));
        assert!(!summary.contains(" real"));
        assert_eq!(summary.lines().count(), 5);
    }
}
