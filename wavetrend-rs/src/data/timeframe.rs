//! Timeframe type and bar bucketing.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Bar interval in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    interval_ms: i64,
}

impl Timeframe {
    pub fn from_millis(interval_ms: i64) -> Result<Self, CoreError> {
        if interval_ms <= 0 {
            return Err(CoreError::InvalidConfig(format!(
                "timeframe interval must be positive, got {}ms",
                interval_ms
            )));
        }
        Ok(Self { interval_ms })
    }

    pub const fn seconds(n: i64) -> Self {
        Self { interval_ms: n * SECOND_MS }
    }

    pub const fn minutes(n: i64) -> Self {
        Self { interval_ms: n * MINUTE_MS }
    }

    pub const fn hours(n: i64) -> Self {
        Self { interval_ms: n * HOUR_MS }
    }

    pub const fn days(n: i64) -> Self {
        Self { interval_ms: n * DAY_MS }
    }

    /// Duration of one bar in milliseconds
    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Canonical open time of the bar containing `timestamp`.
    ///
    /// Floors toward negative infinity, so pre-epoch timestamps land in the
    /// right bucket too.
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp.div_euclid(self.interval_ms) * self.interval_ms
    }

    /// Short label such as "1m", "4h" or "1d"
    pub fn label(&self) -> String {
        let ms = self.interval_ms;
        if ms % DAY_MS == 0 {
            format!("{}d", ms / DAY_MS)
        } else if ms % HOUR_MS == 0 {
            format!("{}h", ms / HOUR_MS)
        } else if ms % MINUTE_MS == 0 {
            format!("{}m", ms / MINUTE_MS)
        } else if ms % SECOND_MS == 0 {
            format!("{}s", ms / SECOND_MS)
        } else {
            format!("{}ms", ms)
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Timeframe {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoreError::InvalidConfig(format!("timeframe '{}' has no unit", s)))?;
        let (amount, unit) = s.split_at(split);
        let amount: i64 = amount
            .parse()
            .map_err(|_| CoreError::InvalidConfig(format!("timeframe '{}' has no amount", s)))?;

        let unit_ms = match unit {
            "ms" => 1,
            "s" => SECOND_MS,
            "m" => MINUTE_MS,
            "h" => HOUR_MS,
            "d" => DAY_MS,
            "w" => 7 * DAY_MS,
            _ => {
                return Err(CoreError::InvalidConfig(format!(
                    "unsupported timeframe unit '{}' in '{}'",
                    unit, s
                )))
            }
        };

        let interval_ms = amount
            .checked_mul(unit_ms)
            .ok_or_else(|| CoreError::InvalidConfig(format!("timeframe '{}' is too long", s)))?;
        Self::from_millis(interval_ms)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(timeframe: Timeframe) -> Self {
        timeframe.label()
    }
}
