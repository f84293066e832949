//! Core error taxonomy
//!
//! Every error here is local to one tick or one computation. Callers log and
//! continue; nothing in the core terminates the hosting process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Unknown series {instrument} {timeframe}: register it before use")]
    UnknownSeries { instrument: String, timeframe: String },

    #[error("Stale timestamp {timestamp} for {instrument} {timeframe}: older than current bar {tail}")]
    StaleTimestamp {
        instrument: String,
        timeframe: String,
        timestamp: i64,
        tail: i64,
    },

    #[error("Bar {timestamp} of {instrument} {timeframe} is sealed")]
    SealedBar {
        instrument: String,
        timeframe: String,
        timestamp: i64,
    },

    #[error("Not enough bars: need at least {required}, but got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid tick: {0}")]
    InvalidTick(String),

    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Warm-up errors are expected until a series has enough bars.
    pub fn is_warm_up(&self) -> bool {
        matches!(self, CoreError::InsufficientData { .. })
    }
}
