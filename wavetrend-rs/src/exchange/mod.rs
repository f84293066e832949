//! Exchange integration module
//!
//! Live trades come from barter-data; historical klines from the Binance REST API.

pub mod history;
pub mod streaming;

pub use history::*;
pub use streaming::*;
