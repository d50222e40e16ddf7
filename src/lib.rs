pub mod api;
pub mod chart;
pub mod core;
pub mod report;
