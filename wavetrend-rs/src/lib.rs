//! WaveTrend-RS: streaming candle aggregation and Wave Trend signals
//!
//! This crate turns a live stream of price ticks into fixed-interval bars and
//! recomputes the Wave Trend oscillator over each bar series as it changes:
//! - [barter-rs](https://github.com/barter-rs/barter) for live trades
//! - [ta-rs](https://github.com/greyblake/ta-rs) for the supporting moving averages and RSI
//!
//! # Features
//!
//! - **Data Management**: per (instrument, timeframe) bar series with sealed history
//! - **Aggregation**: tick → bar boundary decisions, late-tick rejection
//! - **Technical Indicators**: Wave Trend (EMA → EMA → CI → EMA → SMA), SMA trend, RSI
//! - **Signals**: overbought/oversold zones and WT1/WT2 crossovers
//! - **Exchange Integration**: Binance trades via barter-data, kline backfill via REST
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wavetrend_rs::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let store = Arc::new(SeriesStore::new());
//!     let pipeline = SignalPipeline::new(store, PipelineConfig::default(), Box::new(LogSink))?;
//!     pipeline.register("BTC/USDT")?;
//!     pipeline.on_tick(&Tick::new("BTC/USDT", 1_700_000_000_000, 42_000.0));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod pipeline;
pub mod signal;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::exchange::*;
    pub use crate::indicators::*;
    pub use crate::pipeline::*;
    pub use crate::signal::*;

    pub use anyhow::{Context, Result};
}

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
