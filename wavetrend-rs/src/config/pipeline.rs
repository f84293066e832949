//! Pipeline configuration

use crate::config::WaveTrendConfig;
use crate::data::Timeframe;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Signal pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wave Trend parameters and thresholds
    pub wave_trend: WaveTrendConfig,
    /// Timeframes aggregated for every instrument
    pub timeframes: Vec<Timeframe>,
    /// Trailing bars replayed on every recomputation
    pub window: usize,
    /// Bars retained per series
    pub max_bars: usize,
    /// Fast SMA period for the trend reading
    pub sma_fast: usize,
    /// Slow SMA period for the trend reading
    pub sma_slow: usize,
    /// RSI period
    pub rsi_period: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wave_trend: WaveTrendConfig::default(),
            timeframes: vec![
                Timeframe::minutes(1),
                Timeframe::minutes(5),
                Timeframe::minutes(15),
                Timeframe::hours(1),
                Timeframe::hours(4),
            ],
            window: 500,
            max_bars: 500,
            sma_fast: 50,
            sma_slow: 200,
            rsi_period: 14,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.wave_trend.validate()?;

        if self.timeframes.is_empty() {
            return Err(CoreError::InvalidConfig("at least one timeframe is required".to_string()));
        }
        let required = self.wave_trend.required_bars();
        if self.window < required {
            return Err(CoreError::InvalidConfig(format!(
                "window {} is shorter than the {} bars Wave Trend needs",
                self.window, required
            )));
        }
        if self.max_bars < self.window {
            return Err(CoreError::InvalidConfig(format!(
                "max_bars {} is smaller than window {}",
                self.max_bars, self.window
            )));
        }
        if self.sma_fast == 0 || self.sma_slow == 0 || self.rsi_period == 0 {
            return Err(CoreError::InvalidConfig(
                "sma_fast, sma_slow and rsi_period must be at least 1".to_string(),
            ));
        }
        if self.window < self.wave_trend.min_stable_window() {
            tracing::warn!(
                "window {} is below the {} bars needed for a stable EMA seed",
                self.window,
                self.wave_trend.min_stable_window()
            );
        }

        Ok(())
    }
}
