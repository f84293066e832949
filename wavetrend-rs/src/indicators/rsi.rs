//! RSI (Relative Strength Index) indicator

use crate::error::CoreError;
use crate::indicators::Indicator;
use ta::indicators::RelativeStrengthIndex;
use ta::Next;

/// RSI indicator wrapper
#[derive(Debug, Clone)]
pub struct RSI {
    inner: RelativeStrengthIndex,
    period: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl RSI {
    /// Create new RSI indicator
    pub fn new(period: usize) -> Result<Self, CoreError> {
        let inner = RelativeStrengthIndex::new(period)
            .map_err(|_| CoreError::InvalidConfig(format!("invalid RSI period {}", period)))?;
        Ok(Self {
            inner,
            period,
            update_count: 0,
            last_value: None,
        })
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for RSI {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        let rsi_value = self.inner.next(value);
        self.update_count += 1;
        if self.update_count > self.period {
            self.last_value = Some(rsi_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        // ta RSI needs period+1 values
        self.update_count > self.period
    }
}

/// RSI at every position of `closes`; `None` until `period + 1` values are seen
pub fn rsi_series(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>, CoreError> {
    let mut rsi = RSI::new(period)?;
    Ok(closes
        .iter()
        .map(|&close| {
            rsi.update(close);
            rsi.value()
        })
        .collect())
}

/// RSI of the last value in `closes` (oldest first), once `period + 1` values exist
pub fn latest_rsi(closes: &[f64], period: usize) -> Result<Option<f64>, CoreError> {
    let mut rsi = RSI::new(period)?;
    for &close in closes {
        rsi.update(close);
    }
    Ok(rsi.value())
}
