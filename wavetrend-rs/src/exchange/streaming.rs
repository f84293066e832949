//! Real-time tick streaming using barter-data

use crate::data::{instrument_name, normalize_pair, Tick};
use crate::Result;
use anyhow::anyhow;
use barter_data::exchange::binance::spot::BinanceSpot;
use barter_data::streams::reconnect::Event;
use barter_data::streams::Streams;
use barter_data::subscription::trade::PublicTrades;
use barter_instrument::instrument::market_data::kind::MarketDataInstrumentKind;
use futures::StreamExt;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Default capacity of the tick channel
pub const DEFAULT_TICK_BUFFER: usize = 10_000;

/// Streams Binance spot public trades as [`Tick`]s.
///
/// barter-data streams are not `Send`, so each instrument runs on its own
/// thread with a current-thread runtime and a `LocalSet`. Reconnects are
/// handled by barter-data; this only logs them.
pub struct TickStreamer {
    handles: Vec<JoinHandle<()>>,
}

impl TickStreamer {
    /// Start one stream per instrument, all feeding the same channel
    pub fn binance(instruments: &[String], buffer: usize) -> Result<(Self, mpsc::Receiver<Tick>)> {
        let (tx, rx) = mpsc::channel(buffer);
        let mut handles = Vec::with_capacity(instruments.len());

        for instrument in instruments {
            let (base, quote) =
                normalize_pair(instrument).ok_or_else(|| anyhow!("unrecognized instrument '{}'", instrument))?;
            let tx = tx.clone();

            let handle = std::thread::Builder::new()
                .name(format!("ticks-{}{}", base.to_lowercase(), quote.to_lowercase()))
                .spawn(move || {
                    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to start runtime for {}/{}: {}", base, quote, e);
                            return;
                        }
                    };
                    let local = tokio::task::LocalSet::new();
                    local.block_on(&rt, async move {
                        if let Err(e) = run_stream(&base, &quote, tx).await {
                            error!("Stream for {}/{} stopped: {}", base, quote, e);
                        }
                    });
                })?;
            handles.push(handle);
        }

        Ok((Self { handles }, rx))
    }

    /// Number of instrument streams started
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether every stream thread has exited
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|h| h.is_finished())
    }
}

async fn run_stream(base: &str, quote: &str, tx: mpsc::Sender<Tick>) -> Result<()> {
    let (base_lc, quote_lc) = (base.to_lowercase(), quote.to_lowercase());
    let streams = Streams::<PublicTrades>::builder()
        .subscribe([(
            BinanceSpot::default(),
            base_lc.as_str(),
            quote_lc.as_str(),
            MarketDataInstrumentKind::Spot,
            PublicTrades,
        )])
        .init()
        .await?;

    let instrument = instrument_name(base, quote);
    info!("✅ Trade stream initialized for {}", instrument);

    let mut market_stream = streams.select_all();
    while let Some(event) = market_stream.next().await {
        match event {
            Event::Item(Ok(market_event)) => {
                let tick = Tick::new(
                    instrument.clone(),
                    market_event.time_exchange.timestamp_millis(),
                    market_event.kind.price,
                );
                if tx.send(tick).await.is_err() {
                    info!("Tick receiver dropped, closing stream for {}", instrument);
                    return Ok(());
                }
            }
            Event::Item(Err(e)) => {
                error!("Error in market event for {}: {}", instrument, e);
            }
            Event::Reconnecting(_origin) => {
                warn!("Reconnecting stream for {}...", instrument);
            }
        }
    }

    warn!("Market stream ended for {}", instrument);
    Ok(())
}
