use std::cmp::Ordering;

use super::error::ProjectionError;
use super::types::{
    ComparisonSummary, HoldBreakdown, MAX_HORIZON_YEARS, MAX_TIMELINE_YEARS, MAX_YEAR, MIN_YEAR,
    Projection, ProjectionOptions, RebuyBreakdown, ScenarioInputs, ScenarioTrajectories, Strategy,
    Trajectory,
};

const TIE_TOLERANCE: f64 = 1e-9;

pub fn run_projection(
    inputs: &ScenarioInputs,
    options: &ProjectionOptions,
) -> Result<Projection, ProjectionError> {
    validate_inputs(inputs)?;
    let anchor_year = validate_options(inputs, options)?;

    let years = timeline(inputs);

    let hold_breakdown = hold_breakdown(inputs);
    let hold_net = hold_trajectory(inputs, &years, hold_breakdown.net_value_now);
    let hold = ScenarioTrajectories {
        gross: options
            .include_gross
            .then(|| hold_trajectory(inputs, &years, inputs.current_value)),
        real: options
            .inflation_adjusted
            .then(|| hold_real_trajectory(inputs, &hold_net, anchor_year)),
        net: hold_net,
    };

    let rebuy_gross = rebuy_gross_trajectory(inputs, after_tax_basis(inputs));
    let rebuy_breakdown = rebuy_breakdown(inputs, &rebuy_gross);
    let rebuy_net = rebuy_net_trajectory(&rebuy_gross, rebuy_breakdown.final_net);
    let rebuy = ScenarioTrajectories {
        real: options
            .inflation_adjusted
            .then(|| discount_trajectory(&rebuy_net, inputs.annual_inflation, anchor_year)),
        net: rebuy_net,
        gross: options.include_gross.then_some(rebuy_gross),
    };

    ensure_scenario_finite("hold", &hold)?;
    ensure_scenario_finite("sell & rebuy", &rebuy)?;

    let summary = compare_strategies(&hold, &rebuy);

    Ok(Projection {
        years,
        sale_year: inputs.sale_year,
        sell_rebuy_year: inputs.sell_rebuy_year,
        discount_anchor_year: options.inflation_adjusted.then_some(anchor_year),
        hold,
        rebuy,
        hold_breakdown,
        rebuy_breakdown,
        summary,
    })
}

pub fn validate_inputs(inputs: &ScenarioInputs) -> Result<(), ProjectionError> {
    for (field, value) in [
        ("purchase_price", inputs.purchase_price),
        ("current_value", inputs.current_value),
        ("sell_rebuy_value", inputs.sell_rebuy_value),
        ("tax_rate", inputs.tax_rate),
        ("annual_return", inputs.annual_return),
        ("annual_inflation", inputs.annual_inflation),
    ] {
        if !value.is_finite() {
            return Err(ProjectionError::NotFinite { field });
        }
    }

    for (field, year) in [
        ("start_year", inputs.start_year),
        ("sale_year", inputs.sale_year),
    ] {
        check_calendar_year(field, year)?;
    }

    if inputs.start_year >= inputs.sale_year {
        return Err(ProjectionError::InvalidTimeline {
            start_year: inputs.start_year,
            sale_year: inputs.sale_year,
        });
    }

    if !(inputs.start_year..=inputs.sale_year).contains(&inputs.sell_rebuy_year) {
        return Err(ProjectionError::OutOfRange {
            field: "sell_rebuy_year",
            value: f64::from(inputs.sell_rebuy_year),
            min: f64::from(inputs.start_year),
            max: f64::from(inputs.sale_year),
        });
    }

    if !(0.0..=1.0).contains(&inputs.tax_rate) {
        return Err(ProjectionError::OutOfRange {
            field: "tax_rate",
            value: inputs.tax_rate,
            min: 0.0,
            max: 1.0,
        });
    }

    for (field, rate) in [
        ("annual_return", inputs.annual_return),
        ("annual_inflation", inputs.annual_inflation),
    ] {
        if rate <= -1.0 {
            return Err(ProjectionError::OutOfRange {
                field,
                value: rate,
                min: -1.0,
                max: f64::INFINITY,
            });
        }
    }

    if inputs.years_to_future > MAX_HORIZON_YEARS {
        return Err(ProjectionError::OutOfRange {
            field: "years_to_future",
            value: f64::from(inputs.years_to_future),
            min: 0.0,
            max: f64::from(MAX_HORIZON_YEARS),
        });
    }

    let span = inputs
        .sale_year
        .checked_sub(inputs.start_year)
        .and_then(|years| u32::try_from(years).ok())
        .and_then(|years| years.checked_add(inputs.years_to_future))
        .and_then(|years| years.checked_add(1));
    match span {
        Some(points) if points <= MAX_TIMELINE_YEARS => Ok(()),
        _ => Err(ProjectionError::OutOfRange {
            field: "timeline",
            value: f64::from(span.unwrap_or(u32::MAX)),
            min: 2.0,
            max: f64::from(MAX_TIMELINE_YEARS),
        }),
    }
}

/// Checks the options against already validated inputs and returns the
/// resolved discount anchor year.
pub fn validate_options(
    inputs: &ScenarioInputs,
    options: &ProjectionOptions,
) -> Result<i32, ProjectionError> {
    let anchor_year = options.discount_anchor.resolve(inputs);
    check_calendar_year("anchor_year", anchor_year)?;
    Ok(anchor_year)
}

fn check_calendar_year(field: &'static str, year: i32) -> Result<(), ProjectionError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ProjectionError::OutOfRange {
            field,
            value: f64::from(year),
            min: f64::from(MIN_YEAR),
            max: f64::from(MAX_YEAR),
        })
    }
}

pub fn timeline(inputs: &ScenarioInputs) -> Vec<i32> {
    (inputs.start_year..=inputs.end_year()).collect()
}

fn hold_breakdown(inputs: &ScenarioInputs) -> HoldBreakdown {
    let gain = inputs.current_value - inputs.purchase_price;
    let after_tax_gain = gain * (1.0 - inputs.tax_rate);
    HoldBreakdown {
        gain,
        tax_paid: gain - after_tax_gain,
        after_tax_gain,
        net_value_now: inputs.purchase_price + after_tax_gain,
    }
}

fn after_tax_basis(inputs: &ScenarioInputs) -> f64 {
    let gain = inputs.sell_rebuy_value - inputs.purchase_price;
    inputs.sell_rebuy_value - gain * inputs.tax_rate
}

fn rebuy_breakdown(inputs: &ScenarioInputs, gross: &Trajectory) -> RebuyBreakdown {
    let gain = inputs.sell_rebuy_value - inputs.purchase_price;
    let tax_paid = gain * inputs.tax_rate;
    let after_tax_basis = inputs.sell_rebuy_value - tax_paid;
    let final_gross = gross.last().map_or(after_tax_basis, |(_, value)| value);
    // Only the growth since the rebuy is taxed at the final sale.
    let final_gain = final_gross - after_tax_basis;
    let final_tax = final_gain * inputs.tax_rate;
    RebuyBreakdown {
        gain,
        tax_paid,
        after_tax_basis,
        final_gross,
        final_gain,
        final_tax,
        final_net: final_gross - final_tax,
    }
}

/// Hold path on the full axis: straight line from the purchase price to the
/// current value, `sale_value` at the sale year, then compounded growth.
fn hold_trajectory(inputs: &ScenarioInputs, years: &[i32], sale_value: f64) -> Trajectory {
    let pre_sale = interpolate(
        inputs.purchase_price,
        inputs.current_value,
        (inputs.sale_year - inputs.start_year + 1) as usize,
    );
    let values = years
        .iter()
        .map(|&year| match year.cmp(&inputs.sale_year) {
            Ordering::Less => pre_sale[(year - inputs.start_year) as usize],
            Ordering::Equal => sale_value,
            Ordering::Greater => compound(sale_value, inputs.annual_return, year - inputs.sale_year),
        })
        .collect();
    Trajectory {
        years: years.to_vec(),
        values,
    }
}

fn hold_real_trajectory(inputs: &ScenarioInputs, net: &Trajectory, anchor_year: i32) -> Trajectory {
    let values = net
        .points()
        .map(|(year, value)| {
            if year < inputs.sale_year {
                value
            } else {
                discount(value, inputs.annual_inflation, year, anchor_year)
            }
        })
        .collect();
    Trajectory {
        years: net.years.clone(),
        values,
    }
}

fn rebuy_gross_trajectory(inputs: &ScenarioInputs, basis: f64) -> Trajectory {
    let years: Vec<i32> = (inputs.sell_rebuy_year..=inputs.end_year()).collect();
    let values = years
        .iter()
        .map(|&year| compound(basis, inputs.annual_return, year - inputs.sell_rebuy_year))
        .collect();
    Trajectory { years, values }
}

fn rebuy_net_trajectory(gross: &Trajectory, final_net: f64) -> Trajectory {
    let mut net = gross.clone();
    if let Some(last) = net.values.last_mut() {
        *last = final_net;
    }
    net
}

fn discount_trajectory(nominal: &Trajectory, inflation: f64, anchor_year: i32) -> Trajectory {
    Trajectory {
        years: nominal.years.clone(),
        values: nominal
            .points()
            .map(|(year, value)| discount(value, inflation, year, anchor_year))
            .collect(),
    }
}

fn compare_strategies(
    hold: &ScenarioTrajectories,
    rebuy: &ScenarioTrajectories,
) -> ComparisonSummary {
    let (final_year, hold_final_net) = hold.net.last().unwrap_or_default();
    let rebuy_final_net = rebuy.net.last().map_or(0.0, |(_, value)| value);
    let net_advantage = rebuy_final_net - hold_final_net;

    let hold_final_real = hold.real.as_ref().and_then(Trajectory::last).map(|(_, v)| v);
    let rebuy_final_real = rebuy.real.as_ref().and_then(Trajectory::last).map(|(_, v)| v);
    let real_advantage = hold_final_real
        .zip(rebuy_final_real)
        .map(|(hold, rebuy)| rebuy - hold);

    ComparisonSummary {
        final_year,
        hold_final_net,
        rebuy_final_net,
        net_advantage,
        hold_final_real,
        rebuy_final_real,
        real_advantage,
        preferred: preferred_strategy(hold_final_net, net_advantage),
    }
}

fn preferred_strategy(hold_final: f64, advantage: f64) -> Strategy {
    let tolerance = TIE_TOLERANCE * hold_final.abs().max(1.0);
    if advantage.abs() <= tolerance {
        Strategy::Tie
    } else if advantage > 0.0 {
        Strategy::SellAndRebuy
    } else {
        Strategy::Hold
    }
}

fn ensure_scenario_finite(
    scenario: &'static str,
    trajectories: &ScenarioTrajectories,
) -> Result<(), ProjectionError> {
    let series = [
        Some(&trajectories.net),
        trajectories.gross.as_ref(),
        trajectories.real.as_ref(),
    ];
    for trajectory in series.into_iter().flatten() {
        if let Some((year, _)) = trajectory.points().find(|(_, value)| !value.is_finite()) {
            return Err(ProjectionError::Overflow {
                series: scenario,
                year,
            });
        }
    }
    Ok(())
}

/// Evenly spaced values from `from` to `to` inclusive; the endpoint is exact.
fn interpolate(from: f64, to: f64, points: usize) -> Vec<f64> {
    if points <= 1 {
        return vec![to; points];
    }
    let step = (to - from) / (points - 1) as f64;
    let mut values: Vec<f64> = (0..points).map(|i| from + step * i as f64).collect();
    if let Some(last) = values.last_mut() {
        *last = to;
    }
    values
}

fn compound(base: f64, rate: f64, periods: i32) -> f64 {
    base * (1.0 + rate).powi(periods)
}

fn discount(value: f64, inflation: f64, year: i32, anchor_year: i32) -> f64 {
    value / (1.0 + inflation).powi(year.saturating_sub(anchor_year))
}
