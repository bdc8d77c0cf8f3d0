//! In-memory collaborators for tests and offline runs

use crate::client::{RequestSpec, SessionId, Transport};
use crate::diff::AlertSink;
use crate::error::{DecodeError, PersistenceError, Result, WatchError};
use crate::storage::{Ledger, LedgerStore, SnapshotStore, StoreResult};
use crate::types::Snapshot;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

fn injected(what: &str) -> PersistenceError {
    PersistenceError::Parse(format!("injected {} failure", what))
}

/// Snapshot store held in memory
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
    failing: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Default::default()
        }
    }

    /// Store whose reads and writes all fail
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> StoreResult<Snapshot> {
        if self.failing {
            return Err(injected("snapshot read"));
        }
        Ok(self.current())
    }

    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if self.failing {
            return Err(injected("snapshot write"));
        }
        *self.snapshot.lock() = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Ledger store held in memory
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledger: Mutex<Ledger>,
    saves: AtomicUsize,
    failing: bool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Ledger {
        self.ledger.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> StoreResult<Ledger> {
        if self.failing {
            return Err(injected("ledger read"));
        }
        Ok(self.current())
    }

    async fn save(&self, ledger: &Ledger) -> StoreResult<()> {
        if self.failing {
            return Err(injected("ledger write"));
        }
        *self.ledger.lock() = ledger.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Alert sink that keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    messages: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that records attempts but reports every send as failed
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send_alert(&self, text: &str) -> Result<()> {
        self.messages.lock().push(text.to_string());
        if self.failing {
            return Err(WatchError::Notify("injected send failure".to_string()));
        }
        Ok(())
    }
}

/// Transport replaying queued responses in order
///
/// Subscriptions are acknowledged with `ok`; polls pop the next queued body
/// and fall back to a noop packet once the queue is empty. Every request is
/// recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    session: Option<String>,
    polls: Mutex<VecDeque<Result<Vec<u8>>>>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub fn new(session: &str) -> Self {
        Self {
            session: Some(session.to_string()),
            ..Default::default()
        }
    }

    /// Transport whose handshake never yields a session id
    pub fn without_session() -> Self {
        Self::default()
    }

    pub fn push_poll(&self, body: impl Into<Vec<u8>>) -> &Self {
        self.polls.lock().push_back(Ok(body.into()));
        self
    }

    pub fn push_poll_error(&self, err: WatchError) -> &Self {
        self.polls.lock().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().clone()
    }

    /// Routes subscribed so far, in order
    pub fn subscribed_routes(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                RequestSpec::Subscribe { route, .. } => Some(route.clone()),
                RequestSpec::Poll => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open_session(&self) -> Result<SessionId> {
        self.session
            .clone()
            .map(SessionId)
            .ok_or_else(|| DecodeError::NoSessionId.into())
    }

    async fn fetch(&self, _session: &SessionId, request: &RequestSpec) -> Result<Vec<u8>> {
        self.requests.lock().push(request.clone());
        match request {
            RequestSpec::Subscribe { .. } => Ok(b"ok".to_vec()),
            RequestSpec::Poll => self
                .polls
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(b"1:6".to_vec())),
        }
    }
}
