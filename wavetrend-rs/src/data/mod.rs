//! Data management module
//!
//! Handles bars, ticks, per-series storage and tick aggregation.

pub mod aggregator;
pub mod candle;
pub mod instrument;
pub mod series;
pub mod storage;
pub mod timeframe;

pub use aggregator::*;
pub use candle::*;
pub use instrument::*;
pub use series::*;
pub use storage::*;
pub use timeframe::*;
