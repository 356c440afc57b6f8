//! Feeds a loaded dataset into a live loop as a market-event stream.
//!
//! Used for paper trading against historical data and for checking that the
//! live path reproduces a backtest.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::data_loader::LoadedData;
use crate::live::MarketEvent;

/// Spawn a task sending every bar with its signal, in order.
///
/// With `interval` set, the task sleeps between events to mimic a live feed.
/// The task stops early when the receiver is dropped and returns the number
/// of events delivered.
pub fn spawn_replay(
    data: LoadedData,
    capacity: usize,
    interval: Option<Duration>,
) -> (mpsc::Receiver<MarketEvent>, JoinHandle<usize>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut sent = 0;
        for (bar, signal) in data.bars.into_iter().zip(data.signals) {
            if let Some(pause) = interval {
                tokio::time::sleep(pause).await;
            }
            if tx.send(MarketEvent::new(bar, signal)).await.is_err() {
                debug!(sent, "replay receiver dropped");
                break;
            }
            sent += 1;
        }
        sent
    });
    (rx, handle)
}
