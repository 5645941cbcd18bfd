pub mod commands;
pub mod controller;
pub mod ledger;
pub mod state;

pub use controller::{Clock, FastController, FastEvent, FastStats, SystemClock};
pub use ledger::{LedgerError, SessionLedger};
pub use state::{FastStatus, LedgerSnapshot};
