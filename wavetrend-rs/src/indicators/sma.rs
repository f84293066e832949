//! SMA (Simple Moving Average) indicator

use crate::error::CoreError;
use crate::indicators::Indicator;
use ta::indicators::SimpleMovingAverage;
use ta::Next;

/// SMA indicator wrapper
#[derive(Debug, Clone)]
pub struct SMA {
    inner: SimpleMovingAverage,
    period: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl SMA {
    /// Create new SMA indicator
    pub fn new(period: usize) -> Result<Self, CoreError> {
        let inner = SimpleMovingAverage::new(period)
            .map_err(|_| CoreError::InvalidConfig(format!("invalid SMA period {}", period)))?;
        Ok(Self {
            inner,
            period,
            update_count: 0,
            last_value: None,
        })
    }

    /// Get SMA period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for SMA {
    fn name(&self) -> &str {
        "SMA"
    }

    fn update(&mut self, value: f64) {
        let sma_value = self.inner.next(value);
        self.update_count += 1;
        if self.update_count >= self.period {
            self.last_value = Some(sma_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.period
    }
}

/// SMA at every position; `None` until a full window is available
pub fn calculate_sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, CoreError> {
    let mut sma = SMA::new(period)?;
    let mut results = Vec::with_capacity(values.len());

    for &value in values {
        sma.update(value);
        results.push(sma.value());
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_warm_up() {
        let out = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 4).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[2], None);
        assert!((out[3].unwrap() - 2.5).abs() < 1e-12);
        assert!((out[5].unwrap() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_sma_indicator() {
        let mut sma = SMA::new(10).unwrap();
        assert_eq!(sma.name(), "SMA");
        assert_eq!(sma.period(), 10);
        assert!(!sma.is_ready());

        for i in 0..20 {
            sma.update(100.0 + (i as f64 * 0.1));
        }

        assert!(sma.is_ready());
        assert!(sma.value().is_some());
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(SMA::new(0).is_err());
    }
}
