use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("start year {start_year} must be before sale year {sale_year}")]
    InvalidTimeline { start_year: i32, sale_year: i32 },

    #[error("{series} trajectory is not finite at year {year}")]
    Overflow { series: &'static str, year: i32 },
}
