use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::{
    db::{
        helpers::{to_i64, to_u64},
        Database,
    },
    models::FastSession,
    store::HistoryStore,
};

fn row_to_session(row: &Row) -> Result<FastSession> {
    let duration: i64 = row.get("duration")?;

    Ok(FastSession {
        id: row.get("id")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        duration: to_u64(duration, "duration")?,
    })
}

impl Database {
    /// Replaces the stored history in one transaction. `history` is newest
    /// first and its order is kept.
    pub async fn replace_history(&self, history: Vec<FastSession>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open history transaction")?;
            tx.execute("DELETE FROM fast_sessions", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO fast_sessions (position, id, start_time, end_time, duration)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (position, record) in history.iter().enumerate() {
                    stmt.execute(params![
                        to_i64(position as u64)?,
                        record.id,
                        record.start_time,
                        record.end_time,
                        to_i64(record.duration)?,
                    ])
                    .with_context(|| format!("failed to insert fast session {}", record.id))?;
                }
            }
            tx.commit().context("failed to commit history")?;
            Ok(())
        })
        .await
    }

    pub async fn fetch_history(&self) -> Result<Vec<FastSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, start_time, end_time, duration
                 FROM fast_sessions
                 ORDER BY position ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for Database {
    async fn save_history(&self, history: &[FastSession]) -> Result<()> {
        self.replace_history(history.to_vec()).await
    }

    async fn load_history(&self) -> Result<Vec<FastSession>> {
        self.fetch_history().await
    }
}
