//! SVG rendering of a [`Projection`]: both strategies on one year axis with
//! markers at the rebuy year and the hold sale year.

use crate::core::{Projection, Trajectory};

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 100.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICK_TARGET: f64 = 8.0;
const X_TICK_TARGET: f64 = 12.0;

const TITLE_WITH_INFLATION: &str = "Hold vs. Sell & Rebuy: Inflation-Adjusted Comparison";
const TITLE_NOMINAL: &str = "Hold vs. Sell & Rebuy";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    fn dasharray(self) -> Option<&'static str> {
        match self {
            LineStyle::Solid => None,
            LineStyle::Dashed => Some("8 5"),
            LineStyle::Dotted => Some("2 4"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct SeriesStyle {
    label: &'static str,
    color: &'static str,
    width: f64,
    line: LineStyle,
}

const HOLD_GROSS: SeriesStyle = SeriesStyle {
    label: "Hold: Gross Value",
    color: "blue",
    width: 1.5,
    line: LineStyle::Dashed,
};
const HOLD_NET: SeriesStyle = SeriesStyle {
    label: "Hold: After Tax & Growth",
    color: "orange",
    width: 2.0,
    line: LineStyle::Solid,
};
const HOLD_REAL: SeriesStyle = SeriesStyle {
    label: "Hold: After Tax & Inflation",
    color: "orange",
    width: 2.0,
    line: LineStyle::Dotted,
};
const REBUY_GROSS: SeriesStyle = SeriesStyle {
    label: "Sell & Rebuy: Gross Value",
    color: "green",
    width: 1.5,
    line: LineStyle::Dashed,
};
const REBUY_NET: SeriesStyle = SeriesStyle {
    label: "Sell & Rebuy: After Tax & Growth",
    color: "red",
    width: 2.0,
    line: LineStyle::Solid,
};
const REBUY_REAL: SeriesStyle = SeriesStyle {
    label: "Sell & Rebuy: After Tax & Inflation",
    color: "red",
    width: 2.0,
    line: LineStyle::Dotted,
};
const REBUY_MARKER: SeriesStyle = SeriesStyle {
    label: "Sell & Rebuy Year",
    color: "gray",
    width: 1.5,
    line: LineStyle::Dotted,
};
const SALE_MARKER: SeriesStyle = SeriesStyle {
    label: "Sell Year (Hold)",
    color: "black",
    width: 1.5,
    line: LineStyle::Dotted,
};

/// Maps data coordinates onto the plot area.
#[derive(Copy, Clone, Debug)]
struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height() -> f64 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn x(&self, year: f64) -> f64 {
        let span = (self.x_max - self.x_min).max(1.0);
        MARGIN_LEFT + (year - self.x_min) / span * Self::plot_width()
    }

    fn y(&self, value: f64) -> f64 {
        let span = self.y_max - self.y_min;
        MARGIN_TOP + (self.y_max - value) / span * Self::plot_height()
    }
}

pub fn render_svg(projection: &Projection) -> String {
    let series = collect_series(projection);
    let frame = frame_for(projection, &series);
    let title = if projection.hold.real.is_some() {
        TITLE_WITH_INFLATION
    } else {
        TITLE_NOMINAL
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" font-family="sans-serif" font-size="12">"#
    ));
    svg.push('\n');
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    ));
    svg.push('\n');
    push_grid_and_axes(&mut svg, &frame);

    for (style, trajectory) in &series {
        push_polyline(&mut svg, &frame, style, trajectory);
    }
    push_marker(&mut svg, &frame, &REBUY_MARKER, projection.sell_rebuy_year);
    push_marker(&mut svg, &frame, &SALE_MARKER, projection.sale_year);

    let legend: Vec<&SeriesStyle> = series
        .iter()
        .map(|(style, _)| style)
        .chain([&REBUY_MARKER, &SALE_MARKER])
        .collect();
    push_legend(&mut svg, &legend);

    svg.push_str(&format!(
        r#"<text x="{:.1}" y="28" text-anchor="middle" font-size="18">{}</text>"#,
        WIDTH / 2.0,
        escape_xml(title)
    ));
    svg.push('\n');
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14">Year</text>"#,
        MARGIN_LEFT + Frame::plot_width() / 2.0,
        HEIGHT - 15.0
    ));
    svg.push('\n');
    svg.push_str(&format!(
        r#"<text x="20" y="{:.1}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {:.1})">Portfolio Value (€)</text>"#,
        MARGIN_TOP + Frame::plot_height() / 2.0,
        MARGIN_TOP + Frame::plot_height() / 2.0
    ));
    svg.push_str("\n</svg>\n");
    svg
}

fn collect_series(projection: &Projection) -> Vec<(SeriesStyle, &Trajectory)> {
    let hold = &projection.hold;
    let rebuy = &projection.rebuy;
    [
        (HOLD_GROSS, hold.gross.as_ref()),
        (HOLD_NET, Some(&hold.net)),
        (HOLD_REAL, hold.real.as_ref()),
        (REBUY_GROSS, rebuy.gross.as_ref()),
        (REBUY_NET, Some(&rebuy.net)),
        (REBUY_REAL, rebuy.real.as_ref()),
    ]
    .into_iter()
    .filter_map(|(style, trajectory)| trajectory.map(|t| (style, t)))
    .collect()
}

fn frame_for(projection: &Projection, series: &[(SeriesStyle, &Trajectory)]) -> Frame {
    let x_min = projection.years.first().copied().unwrap_or(projection.sale_year);
    let x_max = projection.years.last().copied().unwrap_or(projection.sale_year);

    let (mut y_min, mut y_max) = series
        .iter()
        .flat_map(|(_, trajectory)| trajectory.values.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !y_min.is_finite() || !y_max.is_finite() {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = if y_max > y_min {
        (y_max - y_min) * 0.05
    } else {
        y_max.abs().max(1.0) * 0.05
    };

    Frame {
        x_min: f64::from(x_min),
        x_max: f64::from(x_max),
        y_min: y_min - pad,
        y_max: y_max + pad,
    }
}

fn push_grid_and_axes(svg: &mut String, frame: &Frame) {
    let left = MARGIN_LEFT;
    let right = WIDTH - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = HEIGHT - MARGIN_BOTTOM;

    for tick in nice_ticks(frame.y_min, frame.y_max, Y_TICK_TARGET) {
        let y = frame.y(tick);
        svg.push_str(&format!(
            r##"<line x1="{left:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="#dddddd" stroke-width="1"/>"##
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            left - 8.0,
            y + 4.0,
            format_amount(tick)
        ));
        svg.push('\n');
    }

    let year_step = nice_step(frame.x_max - frame.x_min, X_TICK_TARGET).max(1.0);
    for tick in nice_ticks_with_step(frame.x_min, frame.x_max, year_step) {
        let x = frame.x(tick);
        svg.push_str(&format!(
            r##"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="#dddddd" stroke-width="1"/>"##
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle">{tick:.0}</text>"#,
            bottom + 18.0
        ));
        svg.push('\n');
    }

    svg.push_str(&format!(
        r#"<rect x="{left:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black" stroke-width="1"/>"#,
        Frame::plot_width(),
        Frame::plot_height()
    ));
    svg.push('\n');
}

fn push_polyline(svg: &mut String, frame: &Frame, style: &SeriesStyle, trajectory: &Trajectory) {
    let points: Vec<String> = trajectory
        .points()
        .map(|(year, value)| format!("{:.2},{:.2}", frame.x(f64::from(year)), frame.y(value)))
        .collect();
    svg.push_str(&format!(
        r#"<polyline fill="none" points="{}"{}><title>{}</title></polyline>"#,
        points.join(" "),
        stroke_attributes(style),
        escape_xml(style.label)
    ));
    svg.push('\n');
}

fn push_marker(svg: &mut String, frame: &Frame, style: &SeriesStyle, year: i32) {
    let x = frame.x(f64::from(year));
    svg.push_str(&format!(
        r#"<line x1="{x:.2}" y1="{MARGIN_TOP:.1}" x2="{x:.2}" y2="{:.1}"{}><title>{}</title></line>"#,
        HEIGHT - MARGIN_BOTTOM,
        stroke_attributes(style),
        escape_xml(style.label)
    ));
    svg.push('\n');
}

fn push_legend(svg: &mut String, entries: &[&SeriesStyle]) {
    let x = MARGIN_LEFT + 12.0;
    let y = MARGIN_TOP + 12.0;
    let row = 18.0;
    svg.push_str(&format!(
        r##"<rect x="{x:.1}" y="{y:.1}" width="270" height="{:.1}" fill="white" fill-opacity="0.85" stroke="#bbbbbb"/>"##,
        row * entries.len() as f64 + 10.0
    ));
    svg.push('\n');
    for (idx, style) in entries.iter().enumerate() {
        let line_y = y + 14.0 + row * idx as f64;
        svg.push_str(&format!(
            r#"<line x1="{:.1}" y1="{line_y:.1}" x2="{:.1}" y2="{line_y:.1}"{}/>"#,
            x + 8.0,
            x + 38.0,
            stroke_attributes(style)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            x + 46.0,
            line_y + 4.0,
            escape_xml(style.label)
        ));
        svg.push('\n');
    }
}

fn stroke_attributes(style: &SeriesStyle) -> String {
    let mut attrs = format!(
        r#" stroke="{}" stroke-width="{}""#,
        style.color, style.width
    );
    if let Some(dash) = style.line.dasharray() {
        attrs.push_str(&format!(r#" stroke-dasharray="{dash}""#));
    }
    attrs
}

fn nice_step(span: f64, target: f64) -> f64 {
    if !span.is_finite() || span <= 0.0 {
        return 1.0;
    }
    let raw = span / target;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn nice_ticks(min: f64, max: f64, target: f64) -> Vec<f64> {
    nice_ticks_with_step(min, max, nice_step(max - min, target))
}

fn nice_ticks_with_step(min: f64, max: f64, step: f64) -> Vec<f64> {
    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
