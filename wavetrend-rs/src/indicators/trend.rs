//! Fast/slow SMA trend reading over closes

use crate::data::Bar;
use crate::error::CoreError;
use crate::indicators::calculate_sma;
use serde::{Deserialize, Serialize};

/// Latest fast/slow SMA values and their relation to price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageState {
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub price_above_fast: bool,
    pub price_above_slow: bool,
    pub fast_above_slow: bool,
}

/// Compute the trend reading from bars in chronological order.
///
/// Needs at least `max(fast, slow)` bars.
pub fn compute_moving_averages(bars: &[Bar], fast: usize, slow: usize) -> Result<MovingAverageState, CoreError> {
    let required = fast.max(slow);
    if bars.len() < required {
        return Err(CoreError::InsufficientData {
            required,
            available: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let last = |series: Vec<Option<f64>>| series.last().copied().flatten();
    let (Some(sma_fast), Some(sma_slow)) = (last(calculate_sma(&closes, fast)?), last(calculate_sma(&closes, slow)?))
    else {
        return Err(CoreError::InsufficientData {
            required,
            available: bars.len(),
        });
    };

    let close = closes[closes.len() - 1];
    Ok(MovingAverageState {
        sma_fast,
        sma_slow,
        price_above_fast: close > sma_fast,
        price_above_slow: close > sma_slow,
        fast_above_slow: sma_fast > sma_slow,
    })
}
