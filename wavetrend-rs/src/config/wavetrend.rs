//! Wave Trend configuration

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Wave Trend oscillator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTrendConfig {
    /// Channel length (n1), used by the ESA and D smoothing
    pub channel_length: usize,
    /// Average length (n2), used by the TCI (WT1) smoothing
    pub average_length: usize,
    /// Overbought level 1 (strong)
    pub overbought1: f64,
    /// Overbought level 2
    pub overbought2: f64,
    /// Oversold level 1 (strong)
    pub oversold1: f64,
    /// Oversold level 2
    pub oversold2: f64,
}

impl Default for WaveTrendConfig {
    fn default() -> Self {
        Self {
            channel_length: 10,
            average_length: 21,
            overbought1: 60.0,
            overbought2: 53.0,
            oversold1: -60.0,
            oversold2: -53.0,
        }
    }
}

impl WaveTrendConfig {
    /// Length of the WT2 signal line (simple moving average of WT1)
    pub const SIGNAL_LENGTH: usize = 4;

    /// Minimum number of bars needed for a computation
    pub fn required_bars(&self) -> usize {
        self.channel_length
            .max(self.average_length)
            .max(Self::SIGNAL_LENGTH)
    }

    /// Trailing window after which the EMA seed no longer matters in practice.
    ///
    /// The seed weight decays as `(1 - 2/(n+1))^k`; for `n = 21` and
    /// `k = 210` that is about `e^-20`.
    pub fn min_stable_window(&self) -> usize {
        10 * self.channel_length.max(self.average_length)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.channel_length == 0 || self.average_length == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "channel_length and average_length must be at least 1 (got {} and {})",
                self.channel_length, self.average_length
            )));
        }

        let levels = [
            ("overbought1", self.overbought1),
            ("overbought2", self.overbought2),
            ("oversold1", self.oversold1),
            ("oversold2", self.oversold2),
        ];
        for (name, level) in levels {
            if !level.is_finite() {
                return Err(CoreError::InvalidConfig(format!("{} must be finite", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WaveTrendConfig::default();
        assert_eq!(config.channel_length, 10);
        assert_eq!(config.average_length, 21);
        assert_eq!(config.required_bars(), 21);
        assert_eq!(config.min_stable_window(), 210);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_required_bars_floor_is_signal_length() {
        let config = WaveTrendConfig {
            channel_length: 2,
            average_length: 3,
            ..Default::default()
        };
        assert_eq!(config.required_bars(), 4);
    }

    #[test]
    fn test_rejects_zero_length() {
        let config = WaveTrendConfig {
            channel_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WaveTrendConfig =
            serde_json::from_str(r#"{"channel_length": 9, "overbought1": 70.0}"#).unwrap();
        assert_eq!(config.channel_length, 9);
        assert_eq!(config.average_length, 21);
        assert_eq!(config.overbought1, 70.0);
        assert_eq!(config.oversold2, -53.0);
    }
}
