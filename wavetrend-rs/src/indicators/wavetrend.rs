//! Wave Trend oscillator
//!
//! ```text
//! ap   = (high + low + close) / 3
//! esa  = EMA(ap, n1)
//! d    = EMA(|ap - esa|, n1)
//! ci   = (ap - esa) / (0.015 * d)      (0 when d == 0)
//! wt1  = tci = EMA(ci, n2)
//! wt2  = SMA(wt1, 4)
//! ```
//!
//! Every call replays the bars it is given from the first one, so the result
//! depends on the input window only. Recursive EMAs never fully forget their
//! seed: two windows ending on the same bar agree once both are longer than
//! [`WaveTrendConfig::min_stable_window`].

use crate::config::WaveTrendConfig;
use crate::data::Bar;
use crate::error::CoreError;
use crate::indicators::{calculate_sma, ema_series};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Scale constant of the channel index
pub const CI_SCALE: f64 = 0.015;

/// Crossover flags between WT1 and WT2 at one position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossState {
    /// WT1 was at or below WT2 one step earlier and is above it now
    pub cross_over: bool,
    /// WT1 was at or above WT2 one step earlier and is below it now
    pub cross_under: bool,
}

/// Cross flags at index `i`. Both are false unless WT2 exists at `i - 1` and `i`.
pub fn cross_at(wt1: &[f64], wt2: &[Option<f64>], i: usize) -> CrossState {
    if i == 0 || i >= wt1.len() || i >= wt2.len() {
        return CrossState::default();
    }
    let (Some(prev_wt2), Some(wt2_now)) = (wt2[i - 1], wt2[i]) else {
        return CrossState::default();
    };
    let (prev_wt1, wt1_now) = (wt1[i - 1], wt1[i]);

    CrossState {
        cross_over: prev_wt1 <= prev_wt2 && wt1_now > wt2_now,
        cross_under: prev_wt1 >= prev_wt2 && wt1_now < wt2_now,
    }
}

/// Every intermediate line of a Wave Trend computation, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTrendSeries {
    pub timestamps: Vec<i64>,
    pub ap: Vec<f64>,
    pub esa: Vec<f64>,
    pub d: Vec<f64>,
    pub ci: Vec<f64>,
    /// WT1
    pub tci: Vec<f64>,
    /// `None` for the first three positions
    pub wt2: Vec<Option<f64>>,
    /// Positions where `d == 0` and `ci` was forced to zero
    pub zero_deviation: Vec<bool>,
}

impl WaveTrendSeries {
    pub fn len(&self) -> usize {
        self.tci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tci.is_empty()
    }

    pub fn wt1(&self) -> &[f64] {
        &self.tci
    }

    pub fn cross_at(&self, i: usize) -> CrossState {
        cross_at(&self.tci, &self.wt2, i)
    }

    /// Snapshot of position `i`, classified against `config` thresholds
    pub fn state_at(&self, i: usize, config: &WaveTrendConfig) -> Option<WaveTrendState> {
        if i >= self.len() {
            return None;
        }
        let wt1 = self.tci[i];
        let cross = self.cross_at(i);

        Some(WaveTrendState {
            timestamp: self.timestamps[i],
            ap: self.ap[i],
            esa: self.esa[i],
            d: self.d[i],
            ci: self.ci[i],
            wt1,
            wt2: self.wt2[i],
            overbought1: wt1 >= config.overbought1,
            overbought2: wt1 >= config.overbought2,
            oversold1: wt1 <= config.oversold1,
            oversold2: wt1 <= config.oversold2,
            cross_over: cross.cross_over,
            cross_under: cross.cross_under,
            division_hazard: self.zero_deviation[i],
        })
    }

    /// Snapshot of the most recent position
    pub fn latest(&self, config: &WaveTrendConfig) -> Option<WaveTrendState> {
        self.len().checked_sub(1).and_then(|i| self.state_at(i, config))
    }
}

/// Current Wave Trend reading of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveTrendState {
    /// Open time of the bar this reading belongs to
    pub timestamp: i64,
    pub ap: f64,
    pub esa: f64,
    pub d: f64,
    pub ci: f64,
    /// TCI
    pub wt1: f64,
    pub wt2: Option<f64>,
    pub overbought1: bool,
    pub overbought2: bool,
    pub oversold1: bool,
    pub oversold2: bool,
    pub cross_over: bool,
    pub cross_under: bool,
    /// The channel index of this bar hit the zero-deviation guard
    pub division_hazard: bool,
}

/// Stateless Wave Trend calculator (the indicator stage of the pipeline)
#[derive(Debug, Clone, Default)]
pub struct WaveTrendEngine {
    config: WaveTrendConfig,
}

impl WaveTrendEngine {
    pub fn new(config: WaveTrendConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WaveTrendConfig {
        &self.config
    }

    /// Replace the configuration; applies to later computations only
    pub fn set_config(&mut self, config: WaveTrendConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Minimum number of bars for [`compute`](Self::compute)
    pub fn required_bars(&self) -> usize {
        self.config.required_bars()
    }

    /// Compute every line over `bars`, which may be in either time order
    pub fn compute_series(&self, bars: &[Bar]) -> Result<WaveTrendSeries, CoreError> {
        let required = self.required_bars();
        if bars.len() < required {
            return Err(CoreError::InsufficientData {
                required,
                available: bars.len(),
            });
        }

        let bars = chronological(bars);
        let n1 = self.config.channel_length;
        let n2 = self.config.average_length;

        let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
        let ap: Vec<f64> = bars.iter().map(|b| b.typical_price()).collect();
        let esa = ema_series(&ap, n1)?;

        let deviation: Vec<f64> = ap.iter().zip(&esa).map(|(a, e)| (a - e).abs()).collect();
        let d = ema_series(&deviation, n1)?;

        let mut zero_deviation = Vec::with_capacity(ap.len());
        let ci: Vec<f64> = ap
            .iter()
            .zip(&esa)
            .zip(&d)
            .map(|((a, e), dev)| {
                let zero = *dev == 0.0;
                zero_deviation.push(zero);
                if zero {
                    0.0
                } else {
                    (a - e) / (CI_SCALE * dev)
                }
            })
            .collect();

        let tci = ema_series(&ci, n2)?;
        let wt2 = calculate_sma(&tci, WaveTrendConfig::SIGNAL_LENGTH)?;

        Ok(WaveTrendSeries {
            timestamps,
            ap,
            esa,
            d,
            ci,
            tci,
            wt2,
            zero_deviation,
        })
    }

    /// Compute the reading of the most recent bar
    pub fn compute(&self, bars: &[Bar]) -> Result<WaveTrendState, CoreError> {
        let series = self.compute_series(bars)?;
        series.latest(&self.config).ok_or(CoreError::InsufficientData {
            required: self.required_bars(),
            available: 0,
        })
    }
}

/// Borrow `bars` if already ascending, otherwise return an ascending copy
fn chronological(bars: &[Bar]) -> Cow<'_, [Bar]> {
    if bars.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        return Cow::Borrowed(bars);
    }
    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.timestamp);
    Cow::Owned(sorted)
}
