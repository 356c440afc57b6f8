//! Observers for async consumers and logs.

use quantpipe_core::engine::{BarSnapshot, Observer};
use tokio::sync::watch;
use tracing::{debug, info};

/// Publishes the latest snapshot on a tokio `watch` channel.
///
/// Slow readers only ever see the newest snapshot; the pipeline never waits
/// on them.
#[derive(Debug)]
pub struct WatchObserver {
    tx: watch::Sender<Option<BarSnapshot>>,
}

impl WatchObserver {
    pub fn channel() -> (Self, watch::Receiver<Option<BarSnapshot>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl Observer for WatchObserver {
    fn on_bar(&mut self, snapshot: &BarSnapshot) {
        self.tx.send_replace(Some(snapshot.clone()));
    }
}

/// Logs every snapshot at debug level and every trade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_bar(&mut self, s: &BarSnapshot) {
        if let Some(trade) = &s.last_trade {
            info!(
                bar_index = s.bar_index,
                position = s.position,
                equity = s.equity,
                price = trade.price,
                kind = ?trade.kind,
                "position changed"
            );
        } else {
            debug!(
                bar_index = s.bar_index,
                position = s.position,
                equity = s.equity,
                drawdown = s.drawdown,
                halted = s.halted,
                "bar"
            );
        }
    }
}
