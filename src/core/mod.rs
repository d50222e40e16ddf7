mod engine;
mod error;
mod types;

pub use engine::{run_projection, timeline, validate_inputs, validate_options};
pub use error::ProjectionError;
pub use types::{
    ComparisonSummary, DEFAULT_SALE_YEAR, DEFAULT_START_YEAR, DiscountAnchor, HoldBreakdown,
    MAX_HORIZON_YEARS, MAX_TIMELINE_YEARS, MAX_YEAR, MIN_YEAR, Projection, ProjectionOptions,
    RebuyBreakdown, ScenarioInputs, ScenarioTrajectories, Strategy, Trajectory,
};
