use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FastStatus {
    Idle,
    Fasting,
}

impl Default for FastStatus {
    fn default() -> Self {
        FastStatus::Idle
    }
}

impl FastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FastStatus::Idle => "idle",
            FastStatus::Fasting => "fasting",
        }
    }
}

impl fmt::Display for FastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the ledger handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub status: FastStatus,
    pub active_start: Option<i64>,
    pub elapsed_seconds: u64,
    pub history_len: usize,
}

impl LedgerSnapshot {
    pub fn is_fasting(&self) -> bool {
        self.status == FastStatus::Fasting
    }
}
