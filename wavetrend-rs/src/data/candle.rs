//! OHLCV bar and tick data structures

use crate::error::CoreError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar (candle)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time, epoch milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open a bar from a single price. Volume starts at zero: the tick feed
    /// carries last price only.
    pub fn from_price(timestamp: i64, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price, 0.0)
    }

    /// Open time as a UTC datetime
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Fold a price into the bar
    pub fn apply_price(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    /// Merge a newer reading of the same interval into this bar.
    ///
    /// `open` is kept, the range widens, `close` and `volume` come from `other`.
    pub fn merge(&mut self, other: &Bar) {
        self.high = self.high.max(other.high);
        self.low = self.low.min(other.low);
        self.close = other.close;
        self.volume = other.volume;
    }

    /// Check `low <= min(open, close) <= max(open, close) <= high` and finiteness
    pub fn validate(&self) -> Result<(), CoreError> {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::InvalidBar(format!(
                "non-finite value in bar {}",
                self.timestamp
            )));
        }
        if self.low > self.open.min(self.close) || self.high < self.open.max(self.close) {
            return Err(CoreError::InvalidBar(format!(
                "bar {} violates OHLC ordering (o={} h={} l={} c={})",
                self.timestamp, self.open, self.high, self.low, self.close
            )));
        }
        Ok(())
    }

    /// Get typical price (HLC/3), the Wave Trend source
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Check if bar is bullish
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Check if bar is bearish
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Get total range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A single last-price update from a market data feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Normalized instrument name (e.g., "BTC/USDT")
    pub instrument: String,
    /// Event time, epoch milliseconds
    pub timestamp: i64,
    /// Last traded price
    pub price: f64,
}

impl Tick {
    pub fn new(instrument: impl Into<String>, timestamp: i64, price: f64) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            price,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(CoreError::InvalidTick(format!(
                "price {} for {} at {} is not a positive finite number",
                self.price, self.instrument, self.timestamp
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_from_price() {
        let bar = Bar::from_price(60_000, 10.5);
        assert_eq!(bar.open, 10.5);
        assert_eq!(bar.high, 10.5);
        assert_eq!(bar.low, 10.5);
        assert_eq!(bar.close, 10.5);
        assert_eq!(bar.volume, 0.0);
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn test_apply_price_keeps_invariant() {
        let mut bar = Bar::from_price(0, 100.0);
        for price in [101.0, 99.0, 100.5, 98.0, 103.0] {
            bar.apply_price(price);
            assert!(bar.validate().is_ok());
        }
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 103.0);
        assert_eq!(bar.low, 98.0);
        assert_eq!(bar.close, 103.0);
    }

    #[test]
    fn test_merge() {
        let mut bar = Bar::new(0, 10.0, 11.0, 9.0, 10.5, 5.0);
        bar.merge(&Bar::new(0, 10.2, 12.0, 9.5, 11.5, 7.0));
        assert_eq!(bar, Bar::new(0, 10.0, 12.0, 9.0, 11.5, 7.0));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let bar = Bar::new(0, 10.0, 9.0, 11.0, 10.0, 0.0);
        assert!(matches!(bar.validate(), Err(CoreError::InvalidBar(_))));

        let bar = Bar::new(0, f64::NAN, 11.0, 9.0, 10.0, 0.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn test_typical_price() {
        let bar = Bar::new(0, 9.5, 10.0, 9.0, 9.5, 0.0);
        assert_eq!(bar.typical_price(), 9.5);
        assert_eq!(bar.range(), 1.0);
    }

    #[test]
    fn test_tick_validation() {
        assert!(Tick::new("BTC/USDT", 0, 1.0).validate().is_ok());
        assert!(Tick::new("BTC/USDT", 0, 0.0).validate().is_err());
        assert!(Tick::new("BTC/USDT", 0, f64::INFINITY).validate().is_err());
    }
}
