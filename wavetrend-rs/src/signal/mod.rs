//! Signal module
//!
//! Maps indicator readings to signals and delivers them to sinks.

pub mod evaluator;
pub mod sink;

pub use evaluator::*;
pub use sink::*;
