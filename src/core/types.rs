use serde::Serialize;

pub const DEFAULT_START_YEAR: i32 = 2005;
pub const DEFAULT_SALE_YEAR: i32 = 2025;
pub const MAX_HORIZON_YEARS: u32 = 200;
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2200;
pub const MAX_TIMELINE_YEARS: u32 = 500;

/// Year that inflation discounting is measured from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiscountAnchor {
    FixedYear(i32),
    HoldSaleYear,
}

impl DiscountAnchor {
    pub fn resolve(self, inputs: &ScenarioInputs) -> i32 {
        match self {
            DiscountAnchor::FixedYear(year) => year,
            DiscountAnchor::HoldSaleYear => inputs.sale_year,
        }
    }
}

impl Default for DiscountAnchor {
    fn default() -> Self {
        DiscountAnchor::FixedYear(DEFAULT_SALE_YEAR)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Hold,
    SellAndRebuy,
    Tie,
}

/// Scenario parameters. Rates are fractions, not percents.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioInputs {
    pub purchase_price: f64,
    pub current_value: f64,
    pub sell_rebuy_year: i32,
    pub sell_rebuy_value: f64,
    pub tax_rate: f64,
    pub annual_return: f64,
    pub annual_inflation: f64,
    pub years_to_future: u32,
    pub start_year: i32,
    pub sale_year: i32,
}

impl ScenarioInputs {
    pub fn end_year(&self) -> i32 {
        let horizon = i32::try_from(self.years_to_future).unwrap_or(i32::MAX);
        self.sale_year.saturating_add(horizon)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectionOptions {
    pub inflation_adjusted: bool,
    pub include_gross: bool,
    pub discount_anchor: DiscountAnchor,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            inflation_adjusted: true,
            include_gross: true,
            discount_anchor: DiscountAnchor::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub years: Vec<i32>,
    pub values: Vec<f64>,
}

impl Trajectory {
    pub fn value_at(&self, year: i32) -> Option<f64> {
        self.years
            .iter()
            .position(|&y| y == year)
            .map(|idx| self.values[idx])
    }

    pub fn last(&self) -> Option<(i32, f64)> {
        self.years.last().copied().zip(self.values.last().copied())
    }

    pub fn points(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.years.iter().copied().zip(self.values.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioTrajectories {
    pub gross: Option<Trajectory>,
    pub net: Trajectory,
    pub real: Option<Trajectory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldBreakdown {
    pub gain: f64,
    pub tax_paid: f64,
    pub after_tax_gain: f64,
    pub net_value_now: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuyBreakdown {
    pub gain: f64,
    pub tax_paid: f64,
    pub after_tax_basis: f64,
    pub final_gross: f64,
    pub final_gain: f64,
    pub final_tax: f64,
    pub final_net: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub final_year: i32,
    pub hold_final_net: f64,
    pub rebuy_final_net: f64,
    pub net_advantage: f64,
    pub hold_final_real: Option<f64>,
    pub rebuy_final_real: Option<f64>,
    pub real_advantage: Option<f64>,
    pub preferred: Strategy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub years: Vec<i32>,
    pub sale_year: i32,
    pub sell_rebuy_year: i32,
    pub discount_anchor_year: Option<i32>,
    pub hold: ScenarioTrajectories,
    pub rebuy: ScenarioTrajectories,
    pub hold_breakdown: HoldBreakdown,
    pub rebuy_breakdown: RebuyBreakdown,
    pub summary: ComparisonSummary,
}
