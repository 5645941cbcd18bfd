//! The session ledger: one optional active fast plus the history of completed
//! ones, newest first.
//!
//! Every time-dependent operation takes `now` (epoch milliseconds) from the
//! caller, so the ledger itself never reads a clock.

use thiserror::Error;

use crate::models::{elapsed_seconds, FastSession};

use super::{FastStatus, LedgerSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("cannot {operation} while {state}")]
    InvalidStateTransition {
        state: FastStatus,
        operation: &'static str,
    },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    status: FastStatus,
    active_start: Option<i64>,
    elapsed_seconds: u64,
    history: Vec<FastSession>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts Idle with a previously saved history (newest first).
    pub fn with_history(history: Vec<FastSession>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn start_fast(&mut self, now: i64) -> LedgerResult<()> {
        self.require(FastStatus::Idle, "start a fast")?;
        self.status = FastStatus::Fasting;
        self.active_start = Some(now);
        self.elapsed_seconds = 0;
        Ok(())
    }

    /// Recomputes the elapsed counter. Returns the new value.
    pub fn tick(&mut self, now: i64) -> LedgerResult<u64> {
        let start = self.active(FastStatus::Fasting, "tick")?;
        self.elapsed_seconds = elapsed_seconds(start, now);
        Ok(self.elapsed_seconds)
    }

    pub fn end_fast(&mut self, now: i64) -> LedgerResult<FastSession> {
        let start = self.active(FastStatus::Fasting, "end a fast")?;
        let session = FastSession::completed(start, now);
        self.history.insert(0, session.clone());

        self.status = FastStatus::Idle;
        self.active_start = None;
        self.elapsed_seconds = 0;
        Ok(session)
    }

    /// Removes the first session whose id matches. Returns whether one was removed.
    pub fn delete_session(&mut self, id: &str) -> bool {
        match self.history.iter().position(|session| session.id == id) {
            Some(index) => {
                self.history.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn status(&self) -> FastStatus {
        self.status
    }

    pub fn is_fasting(&self) -> bool {
        self.status == FastStatus::Fasting
    }

    pub fn active_start(&self) -> Option<i64> {
        self.active_start
    }

    /// Only meaningful while fasting; zero otherwise.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn history(&self) -> &[FastSession] {
        &self.history
    }

    pub fn session(&self, id: &str) -> Option<&FastSession> {
        self.history.iter().find(|session| session.id == id)
    }

    pub fn total_fasted_seconds(&self) -> u64 {
        self.history
            .iter()
            .fold(0u64, |total, session| total.saturating_add(session.duration))
    }

    pub fn longest_session(&self) -> Option<&FastSession> {
        // max_by_key keeps the last maximum; reverse so ties favour the newest.
        self.history
            .iter()
            .rev()
            .max_by_key(|session| session.duration)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            status: self.status,
            active_start: self.active_start,
            elapsed_seconds: self.elapsed_seconds,
            history_len: self.history.len(),
        }
    }

    fn require(&self, expected: FastStatus, operation: &'static str) -> LedgerResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(LedgerError::InvalidStateTransition {
                state: self.status,
                operation,
            })
        }
    }

    fn active(&self, expected: FastStatus, operation: &'static str) -> LedgerResult<i64> {
        self.require(expected, operation)?;
        self.active_start.ok_or(LedgerError::InvalidStateTransition {
            state: self.status,
            operation,
        })
    }
}
