//! Configuration module

pub mod pipeline;
pub mod wavetrend;

pub use pipeline::*;
pub use wavetrend::*;
