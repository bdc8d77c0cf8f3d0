//! Market diff and notification engine
//!
//! Compares the current snapshot with the previous one, alerts once per
//! match when a bet type name appears for the first time, and records the
//! alert in the ledger. Price or tier changes under an existing type name
//! are not novelty.

mod render;

pub use render::{escape_html, render_alert};

use crate::error::Result;
use crate::ordering::order_bets;
use crate::storage::{Ledger, LedgerStore, SnapshotStore};
use crate::types::{Bet, Match, Snapshot};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

/// Outbound alert channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver pre-rendered HTML text
    async fn send_alert(&self, text: &str) -> Result<()>;
}

/// Previous cycle's bets keyed by match link then bet type name
pub type BetIndex<'a> = HashMap<&'a str, HashMap<&'a str, &'a Bet>>;

pub fn build_bet_index(snapshot: &[Match]) -> BetIndex<'_> {
    let mut index: BetIndex<'_> = HashMap::new();
    for m in snapshot {
        let bets = index.entry(m.link.as_str()).or_default();
        for bet in &m.bets {
            bets.insert(bet.type_name(), bet);
        }
    }
    index
}

/// Bets of `current` whose type name the previous cycle did not have
pub fn novel_bets<'m>(current: &'m Match, previous: &BetIndex<'_>) -> Vec<&'m Bet> {
    match previous.get(current.link.as_str()) {
        None => current.bets.iter().collect(),
        Some(known) => current
            .bets
            .iter()
            .filter(|bet| !known.contains_key(bet.type_name()))
            .collect(),
    }
}

/// Outcome of one diff pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    /// Matches skipped because of a live ledger entry
    pub suppressed: usize,
    pub novel_bets: usize,
    /// Ledger entries dropped on rewrite
    pub pruned: usize,
}

pub struct DiffEngine<S, L> {
    snapshots: S,
    ledger: L,
    retention: Duration,
}

impl<S, L> DiffEngine<S, L>
where
    S: SnapshotStore,
    L: LedgerStore,
{
    pub fn new(snapshots: S, ledger: L, retention: Duration) -> Self {
        Self {
            snapshots,
            ledger,
            retention,
        }
    }

    pub fn with_retention_days(snapshots: S, ledger: L, days: i64) -> Self {
        Self::new(snapshots, ledger, Duration::days(days))
    }

    pub fn snapshot_store(&self) -> &S {
        &self.snapshots
    }

    pub fn ledger_store(&self) -> &L {
        &self.ledger
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    async fn load_previous(&self) -> Snapshot {
        match self.snapshots.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Previous snapshot unreadable, starting empty: {}", e);
                Snapshot::new()
            }
        }
    }

    async fn load_ledger(&self) -> Ledger {
        match self.ledger.load().await {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("Ledger unreadable, starting empty: {}", e);
                Ledger::new()
            }
        }
    }

    /// Diff `current` against the stored snapshot, alert, then persist
    ///
    /// Store failures never abort the pass: reads degrade to empty state and
    /// writes are logged. An alert already sent stays sent.
    pub async fn run_cycle<A>(&self, current: &[Match], alerts: &A, now: DateTime<Utc>) -> DiffReport
    where
        A: AlertSink + ?Sized,
    {
        let previous = self.load_previous().await;
        let mut ledger = self.load_ledger().await;
        let index = build_bet_index(&previous);

        let mut report = DiffReport::default();
        // a title listed twice in one cycle alerts once
        let mut alerted: HashSet<&str> = HashSet::new();

        for m in current {
            if alerted.contains(m.title.as_str())
                || ledger.is_suppressed(&m.title, now, self.retention)
            {
                debug!("Already notified: {}", m.title);
                report.suppressed += 1;
                continue;
            }

            let novel = novel_bets(m, &index);
            if novel.is_empty() {
                continue;
            }

            let novel = order_bets(novel, &m.title);
            report.novel_bets += novel.len();
            let text = render_alert(m, &novel);

            match alerts.send_alert(&text).await {
                Ok(()) => {
                    info!("🆕 {} new bet(s) on {}", novel.len(), m.title);
                    report.alerts_sent += 1;
                }
                Err(e) => {
                    error!("Alert for {} failed: {}", m.title, e);
                    report.alerts_failed += 1;
                }
            }

            ledger.record(&m.title, &m.link, now);
            alerted.insert(m.title.as_str());
        }

        if let Err(e) = self.snapshots.save(&current.to_vec()).await {
            error!("Failed to persist snapshot: {}", e);
        }

        report.pruned = ledger.prune(now, self.retention);
        if let Err(e) = self.ledger.save(&ledger).await {
            error!("Failed to persist ledger: {}", e);
        }

        report
    }
}
