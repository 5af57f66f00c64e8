//! Small helpers shared by the comparison engine and the report formatters

pub mod comparison;

pub use comparison::{avg_ms_or, latency_comparator, percent_difference, safe_float_cmp};
