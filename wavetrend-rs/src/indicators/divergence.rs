//! RSI divergence detection on confirmed pivots
//!
//! A pivot low of the oscillator at `p` is a value strictly below the
//! `left` values before it and no higher than the `right` values after it
//! (pivot highs mirror this). Only the two most recent pivots of each kind
//! are compared, so a pivot is confirmed `right` bars after it forms.

use crate::data::Bar;
use crate::error::CoreError;
use crate::indicators::rsi_series;
use serde::{Deserialize, Serialize};

/// Bars before a pivot
pub const DIVERGENCE_LOOKBACK_LEFT: usize = 5;
/// Bars after a pivot
pub const DIVERGENCE_LOOKBACK_RIGHT: usize = 5;
/// Fewer bars than this never report a divergence
pub const DIVERGENCE_MIN_BARS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsiDivergences {
    /// Price lower low, RSI higher low
    pub bullish: bool,
    /// Price higher low, RSI lower low
    pub hidden_bullish: bool,
    /// Price higher high, RSI lower high
    pub bearish: bool,
    /// Price lower high, RSI higher high
    pub hidden_bearish: bool,
}

impl RsiDivergences {
    pub fn any(&self) -> bool {
        self.bullish || self.hidden_bullish || self.bearish || self.hidden_bearish
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Pivot {
    Low,
    High,
}

fn is_pivot(osc: &[Option<f64>], p: usize, left: usize, right: usize, kind: Pivot) -> bool {
    let Some(centre) = osc[p] else {
        return false;
    };
    let beats = |other: Option<f64>, strict: bool| match (other, kind) {
        (None, _) => false,
        (Some(v), Pivot::Low) if strict => centre < v,
        (Some(v), Pivot::Low) => centre <= v,
        (Some(v), Pivot::High) if strict => centre > v,
        (Some(v), Pivot::High) => centre >= v,
    };

    osc[p - left..p].iter().all(|&v| beats(v, true)) && osc[p + 1..=p + right].iter().all(|&v| beats(v, false))
}

/// Indices of the two most recent confirmed pivots, older first
fn last_two_pivots(osc: &[Option<f64>], left: usize, right: usize, kind: Pivot) -> Option<(usize, usize)> {
    if osc.len() < left + right + 1 {
        return None;
    }
    let mut found = (left..osc.len() - right)
        .rev()
        .filter(|&p| is_pivot(osc, p, left, right, kind));
    let recent = found.next()?;
    let previous = found.next()?;
    Some((previous, recent))
}

/// Compare the two latest oscillator pivots against price at the same bars.
///
/// `lows`, `highs` and `osc` are aligned and oldest first.
pub fn detect_divergences(
    lows: &[f64],
    highs: &[f64],
    osc: &[Option<f64>],
    left: usize,
    right: usize,
) -> RsiDivergences {
    let mut out = RsiDivergences::default();
    let len = osc.len().min(lows.len()).min(highs.len());
    let osc = &osc[..len];

    if let Some((a, b)) = last_two_pivots(osc, left, right, Pivot::Low) {
        if let (Some(ra), Some(rb)) = (osc[a], osc[b]) {
            out.bullish = lows[b] < lows[a] && rb > ra;
            out.hidden_bullish = lows[b] > lows[a] && rb < ra;
        }
    }
    if let Some((a, b)) = last_two_pivots(osc, left, right, Pivot::High) {
        if let (Some(ra), Some(rb)) = (osc[a], osc[b]) {
            out.bearish = highs[b] > highs[a] && rb < ra;
            out.hidden_bearish = highs[b] < highs[a] && rb > ra;
        }
    }
    out
}

/// RSI divergences over bars in chronological order
pub fn compute_rsi_divergences(bars: &[Bar], rsi_period: usize) -> Result<RsiDivergences, CoreError> {
    if bars.len() < DIVERGENCE_MIN_BARS {
        return Err(CoreError::InsufficientData {
            required: DIVERGENCE_MIN_BARS,
            available: bars.len(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let rsi = rsi_series(&closes, rsi_period)?;

    Ok(detect_divergences(
        &lows,
        &highs,
        &rsi,
        DIVERGENCE_LOOKBACK_LEFT,
        DIVERGENCE_LOOKBACK_RIGHT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // pivot lows at 2 and 7, one pivot high at 4
    const TROUGHS: [f64; 11] = [50.0, 45.0, 30.0, 45.0, 50.0, 48.0, 42.0, 35.0, 42.0, 50.0, 55.0];

    fn osc(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn flat_with(at: [(usize, f64); 2], level: f64) -> Vec<f64> {
        let mut out = vec![level; TROUGHS.len()];
        for (i, v) in at {
            out[i] = v;
        }
        out
    }

    fn mirrored(values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| 100.0 - v).collect()
    }

    #[test]
    fn test_regular_bullish() {
        let lows = flat_with([(2, 100.0), (7, 95.0)], 110.0);
        let highs: Vec<f64> = lows.iter().map(|l| l + 5.0).collect();

        let found = detect_divergences(&lows, &highs, &osc(&TROUGHS), 2, 2);
        assert_eq!(
            found,
            RsiDivergences {
                bullish: true,
                ..RsiDivergences::default()
            }
        );
    }

    #[test]
    fn test_hidden_bullish() {
        let mut values = TROUGHS;
        values[7] = 25.0;
        let lows = flat_with([(2, 100.0), (7, 105.0)], 110.0);
        let highs: Vec<f64> = lows.iter().map(|l| l + 5.0).collect();

        let found = detect_divergences(&lows, &highs, &osc(&values), 2, 2);
        assert_eq!(
            found,
            RsiDivergences {
                hidden_bullish: true,
                ..RsiDivergences::default()
            }
        );
    }

    #[test]
    fn test_regular_bearish() {
        let highs = flat_with([(2, 100.0), (7, 105.0)], 90.0);
        let lows: Vec<f64> = highs.iter().map(|h| h - 5.0).collect();

        let found = detect_divergences(&lows, &highs, &osc(&mirrored(&TROUGHS)), 2, 2);
        assert_eq!(
            found,
            RsiDivergences {
                bearish: true,
                ..RsiDivergences::default()
            }
        );
    }

    #[test]
    fn test_hidden_bearish() {
        let mut values = mirrored(&TROUGHS);
        values[7] = 75.0;
        let highs = flat_with([(2, 100.0), (7, 95.0)], 90.0);
        let lows: Vec<f64> = highs.iter().map(|h| h - 5.0).collect();

        let found = detect_divergences(&lows, &highs, &osc(&values), 2, 2);
        assert_eq!(
            found,
            RsiDivergences {
                hidden_bearish: true,
                ..RsiDivergences::default()
            }
        );
    }

    #[test]
    fn test_undefined_oscillator_is_not_a_pivot() {
        let mut values = osc(&TROUGHS);
        values[0] = None;
        let lows = flat_with([(2, 100.0), (7, 95.0)], 110.0);
        let highs: Vec<f64> = lows.iter().map(|l| l + 5.0).collect();

        assert!(!detect_divergences(&lows, &highs, &values, 2, 2).any());
    }

    #[test]
    fn test_needs_twenty_bars() {
        let bars: Vec<Bar> = (0..19).map(|i| Bar::from_price(i * 60_000, 100.0 + i as f64)).collect();
        let err = compute_rsi_divergences(&bars, 14).unwrap_err();
        assert!(err.is_warm_up());
        assert_eq!(
            err,
            CoreError::InsufficientData {
                required: 20,
                available: 19
            }
        );
    }

    #[test]
    fn test_monotonic_prices_have_no_divergence() {
        let bars: Vec<Bar> = (0..60).map(|i| Bar::from_price(i * 60_000, 100.0 + i as f64)).collect();
        assert_eq!(compute_rsi_divergences(&bars, 14).unwrap(), RsiDivergences::default());
    }
}
