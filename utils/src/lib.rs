//! Shared utilities for Tidal.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, LogFormat, UnknownLogFormat};
pub use stats::StatsCounter;
pub use time::format_duration;
