//! Signals: the discrete per-bar input to the pipeline.
//!
//! Signal computation is external. The pipeline only consumes a sequence of
//! `SignalEvent`s, one per bar, through the `SignalSource` trait.

pub mod lag;

pub use lag::SignalLagger;

use crate::error::SignalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete trading signal in {-1, 0, +1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Signal {
    Short,
    Neutral,
    Long,
}

impl Signal {
    pub fn value(self) -> i8 {
        match self {
            Signal::Short => -1,
            Signal::Neutral => 0,
            Signal::Long => 1,
        }
    }
}

impl TryFrom<i8> for Signal {
    type Error = SignalError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Signal::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Signal {
    type Error = SignalError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Neutral),
            1 => Ok(Signal::Long),
            other => Err(SignalError(other)),
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.value()
    }
}

/// A signal observed at the close of the bar with the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
}

impl SignalEvent {
    pub fn new(timestamp: DateTime<Utc>, signal: Signal) -> Self {
        Self { timestamp, signal }
    }
}

/// Produces one signal per bar, in bar order.
pub trait SignalSource {
    /// Next event, or `None` once the source is exhausted.
    fn next_signal(&mut self) -> Option<SignalEvent>;
}

/// Pre-materialised signal sequence.
#[derive(Debug, Clone, Default)]
pub struct VecSignalSource {
    events: Vec<SignalEvent>,
    cursor: usize,
}

impl VecSignalSource {
    pub fn new(events: Vec<SignalEvent>) -> Self {
        Self { events, cursor: 0 }
    }

    /// Pair raw values with timestamps, validating every value.
    pub fn from_values(
        timestamps: impl IntoIterator<Item = DateTime<Utc>>,
        values: impl IntoIterator<Item = i8>,
    ) -> Result<Self, SignalError> {
        let events = timestamps
            .into_iter()
            .zip(values)
            .map(|(ts, v)| Signal::try_from(v).map(|s| SignalEvent::new(ts, s)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(events))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl SignalSource for VecSignalSource {
    fn next_signal(&mut self) -> Option<SignalEvent> {
        let event = self.events.get(self.cursor).copied();
        if event.is_some() {
            self.cursor += 1;
        }
        event
    }
}
