use serde::{Deserialize, Serialize};

/// A completed fast. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastSession {
    /// End timestamp rendered as decimal; unique only while no two fasts
    /// end in the same millisecond.
    pub id: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Whole seconds between `start_time` and `end_time`.
    pub duration: u64,
}

impl FastSession {
    /// Builds the record for a fast that began at `start_time` and ended at
    /// `end_time`. An end earlier than the start collapses to a zero-length
    /// session stamped at the start.
    pub fn completed(start_time: i64, end_time: i64) -> Self {
        let end_time = end_time.max(start_time);
        Self {
            id: end_time.to_string(),
            start_time,
            end_time,
            duration: elapsed_seconds(start_time, end_time),
        }
    }
}

/// `floor((now - start) / 1000)`, clamped at zero.
pub fn elapsed_seconds(start_ms: i64, now_ms: i64) -> u64 {
    let delta = now_ms.saturating_sub(start_ms).max(0);
    (delta / 1000) as u64
}
