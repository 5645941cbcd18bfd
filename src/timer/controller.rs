use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    format::format_duration,
    log_info, log_warn,
    models::FastSession,
    store::HistoryStore,
};

use super::{LedgerSnapshot, SessionLedger};

const ENABLE_LOGS: bool = true;
const EVENT_CAPACITY: usize = 64;

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FastEvent {
    StateChanged { snapshot: LedgerSnapshot },
    Tick { elapsed_seconds: u64 },
    SessionCompleted { session: FastSession },
    HistoryChanged { len: usize },
}

struct Ticker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn stop(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Async owner of the ledger. Runs the one-second ticker while a fast is
/// active and writes history through to the configured store.
#[derive(Clone)]
pub struct FastController {
    ledger: Arc<Mutex<SessionLedger>>,
    store: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    events: broadcast::Sender<FastEvent>,
}

impl FastController {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        let debug_mode = std::env::var("FASTWAY_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            ledger: Arc::new(Mutex::new(SessionLedger::new())),
            store,
            clock,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
            heartbeat_every_ticks: if debug_mode { 1 } else { 60 },
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FastEvent> {
        self.events.subscribe()
    }

    /// Replaces the in-memory history with whatever the store holds. Only
    /// valid while idle.
    pub async fn load_history(&self) -> Result<usize> {
        let history = self
            .store
            .load_history()
            .await
            .context("failed to load fasting history")?;
        let len = history.len();

        {
            let mut ledger = self.ledger.lock().await;
            if ledger.is_fasting() {
                anyhow::bail!("cannot load history while a fast is active");
            }
            *ledger = SessionLedger::with_history(history);
        }

        log_info!("Loaded {} past fasts", len);
        self.emit(FastEvent::HistoryChanged { len });
        Ok(len)
    }

    pub async fn get_snapshot(&self) -> LedgerSnapshot {
        self.ledger.lock().await.snapshot()
    }

    pub async fn history(&self) -> Vec<FastSession> {
        self.ledger.lock().await.history().to_vec()
    }

    pub async fn stats(&self) -> FastStats {
        let ledger = self.ledger.lock().await;
        FastStats {
            count: ledger.history().len(),
            total_seconds: ledger.total_fasted_seconds(),
            longest: ledger.longest_session().cloned(),
        }
    }

    pub async fn is_ticking(&self) -> bool {
        match self.ticker.lock().await.as_ref() {
            Some(ticker) => !ticker.handle.is_finished(),
            None => false,
        }
    }

    pub async fn start_fast(&self) -> Result<LedgerSnapshot> {
        // Ticker lock first, then ledger; the tick task only takes the ledger.
        let mut ticker = self.ticker.lock().await;
        let snapshot = {
            let mut ledger = self.ledger.lock().await;
            ledger.start_fast(self.clock.now_ms())?;
            ledger.snapshot()
        };
        self.spawn_ticker(&mut ticker);
        drop(ticker);

        log_info!("Fast started at {:?}", snapshot.active_start);
        self.emit(FastEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Records the active fast. The ledger only changes once the store has
    /// accepted the new history; on a save error the fast keeps running.
    pub async fn end_fast(&self) -> Result<FastSession> {
        let mut ticker = self.ticker.lock().await;
        let (session, snapshot, len) = {
            let mut ledger = self.ledger.lock().await;
            let mut next = ledger.clone();
            let session = next.end_fast(self.clock.now_ms())?;
            self.persist(next.history()).await?;

            if let Some(running) = ticker.take() {
                running.stop();
            }
            *ledger = next;
            (session, ledger.snapshot(), ledger.history().len())
        };
        drop(ticker);

        log_info!(
            "Fast {} ended after {}",
            session.id,
            format_duration(session.duration)
        );

        self.emit(FastEvent::StateChanged { snapshot });
        self.emit(FastEvent::SessionCompleted {
            session: session.clone(),
        });
        self.emit(FastEvent::HistoryChanged { len });
        Ok(session)
    }

    /// Returns whether a session with `id` existed. Nothing is removed if the
    /// store rejects the new history.
    pub async fn delete_session(&self, id: &str) -> Result<bool> {
        let len = {
            let mut ledger = self.ledger.lock().await;
            let mut next = ledger.clone();
            if !next.delete_session(id) {
                return Ok(false);
            }
            self.persist(next.history()).await?;
            *ledger = next;
            ledger.history().len()
        };

        log_info!("Deleted fast {}", id);
        self.emit(FastEvent::HistoryChanged { len });
        Ok(true)
    }

    /// Empties the history once the store has been emptied.
    pub async fn clear_history(&self) -> Result<()> {
        {
            let mut ledger = self.ledger.lock().await;
            self.persist(&[]).await?;
            ledger.clear_history();
        }

        log_info!("Cleared fasting history");
        self.emit(FastEvent::HistoryChanged { len: 0 });
        Ok(())
    }

    /// Stops the ticker. An active fast stays open in memory and is not
    /// recorded.
    pub async fn shutdown(&self) {
        let mut ticker = self.ticker.lock().await;
        if let Some(running) = ticker.take() {
            running.stop();
        }
        if self.ledger.lock().await.is_fasting() {
            log_warn!("Shutting down with an active fast; it will not be recorded");
        }
    }

    fn spawn_ticker(&self, slot: &mut Option<Ticker>) {
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        let token = CancellationToken::new();
        let ledger = self.ledger.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks.max(1);
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval =
                time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let elapsed = {
                    let mut guard = ledger.lock().await;
                    // Cancelled while waiting for the ledger; the fast is over.
                    if cancelled.is_cancelled() {
                        break;
                    }
                    match guard.tick(clock.now_ms()) {
                        Ok(elapsed) => elapsed,
                        Err(err) => {
                            log_warn!("Ticker stopping: {}", err);
                            break;
                        }
                    }
                };

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    log_info!("Fasting for {}", format_duration(elapsed));
                }

                let _ = events.send(FastEvent::Tick {
                    elapsed_seconds: elapsed,
                });
            }
        });

        *slot = Some(Ticker { token, handle });
    }

    async fn persist(&self, history: &[FastSession]) -> Result<()> {
        self.store
            .save_history(history)
            .await
            .context("failed to save fasting history")
    }

    fn emit(&self, event: FastEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FastStats {
    pub count: usize,
    pub total_seconds: u64,
    pub longest: Option<FastSession>,
}
