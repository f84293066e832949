//! Technical indicators module
//!
//! Wave Trend is computed by full replay over a bar window; the supporting
//! SMA and RSI readings use the `ta` crate.

pub mod divergence;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod trend;
pub mod wavetrend;

pub use divergence::*;
pub use ema::*;
pub use rsi::*;
pub use sma::*;
pub use trend::*;
pub use wavetrend::*;

/// Indicator trait for all indicators
pub trait Indicator {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, value: f64);

    /// Get current indicator value
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}
