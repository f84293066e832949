//! Signal sinks
//!
//! The pipeline hands every emitted [`SignalEvent`] to a sink. A failing sink
//! is logged by the caller and never stops tick processing.

use crate::signal::SignalEvent;
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Destination for signal events
pub trait SignalSink: Send + Sync {
    fn emit(&self, event: SignalEvent) -> Result<()>;
}

/// Writes every event to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SignalSink for LogSink {
    fn emit(&self, event: SignalEvent) -> Result<()> {
        let kinds: Vec<&str> = event.kinds.iter().map(|k| k.label()).collect();
        tracing::info!(
            "📣 {} {} @ {}: {} (wt1 {:.2}, wt2 {})",
            event.instrument,
            event.timeframe,
            event.bar_timestamp,
            kinds.join(", "),
            event.report.wave_trend.wt1,
            event
                .report
                .wave_trend
                .wt2
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "n/a".to_string()),
        );
        Ok(())
    }
}

/// Forwards events into a bounded tokio channel without blocking
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SignalEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SignalEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SignalEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl SignalSink for ChannelSink {
    fn emit(&self, event: SignalEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(ev) => {
                anyhow!("signal channel full, dropped event {}", ev.id)
            }
            mpsc::error::TrySendError::Closed(ev) => {
                anyhow!("signal channel closed, dropped event {}", ev.id)
            }
        })
    }
}

/// Keeps events in memory; used by replays and tests
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SignalEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SignalEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<SignalEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl SignalSink for CollectingSink {
    fn emit(&self, event: SignalEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

impl<S: SignalSink + ?Sized> SignalSink for std::sync::Arc<S> {
    fn emit(&self, event: SignalEvent) -> Result<()> {
        (**self).emit(event)
    }
}
