//! Domain types for quantpipe.

pub mod bar;
pub mod equity;
pub mod fill;
pub mod log;
pub mod trade;

pub use bar::{Bar, PriceField};
pub use equity::EquityPoint;
pub use fill::{Fill, FillStatus};
pub use log::RunLog;
pub use trade::{AttemptOutcome, Clamp, TradeAttempt, TradeKind, TradeRecord};
