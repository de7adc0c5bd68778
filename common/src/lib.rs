pub mod config;
pub mod util;

/// Placeholder written into report cells when a database or metric is missing
pub const NOT_AVAILABLE: &str = "N/A";
