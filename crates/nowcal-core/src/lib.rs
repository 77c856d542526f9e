//! Core helpers shared by the nowcal crates: tracing setup and time window.

pub mod time;
pub mod tracing;

pub use time::TimeWindow;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
