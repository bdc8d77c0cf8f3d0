//! Notification ledger
//!
//! One entry per notified match title. Entries older than the retention
//! window count as absent and are dropped when the ledger is rewritten.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Link written for entries that never had one
pub const UNKNOWN_LINK: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub match_title: String,
    pub last_notified_at: DateTime<Utc>,
    pub last_known_link: String,
}

impl LedgerEntry {
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now - self.last_notified_at > retention
    }

    /// `RFC3339|title|link`
    pub fn to_line(&self) -> String {
        let link = if self.last_known_link.is_empty() {
            UNKNOWN_LINK
        } else {
            &self.last_known_link
        };
        format!(
            "{}|{}|{}",
            self.last_notified_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.match_title,
            link
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let (timestamp, rest) = line.trim().split_once('|')?;
        let last_notified_at = DateTime::parse_from_rfc3339(timestamp)
            .ok()?
            .with_timezone(&Utc);

        // titles may contain '|', links never do
        let (title, link) = match rest.rsplit_once('|') {
            Some((title, link)) => (title, link),
            None => (rest, UNKNOWN_LINK),
        };
        if title.is_empty() {
            return None;
        }

        Some(Self {
            match_title: title.to_string(),
            last_notified_at,
            last_known_link: link.to_string(),
        })
    }
}

/// Durable record of which matches have already been alerted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, match_title: &str) -> Option<&LedgerEntry> {
        self.entries.get(match_title)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Whether a live entry exists for the title
    pub fn is_suppressed(&self, match_title: &str, now: DateTime<Utc>, retention: Duration) -> bool {
        self.entries
            .get(match_title)
            .is_some_and(|entry| !entry.is_expired(now, retention))
    }

    /// Write or refresh the entry for a title
    pub fn record(&mut self, match_title: &str, link: &str, now: DateTime<Utc>) {
        self.entries.insert(
            match_title.to_string(),
            LedgerEntry {
                match_title: match_title.to_string(),
                last_notified_at: now,
                last_known_link: link.to_string(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, retention));
        before - self.entries.len()
    }

    /// Parse ledger text, skipping blank and unparseable lines
    ///
    /// A title seen twice keeps its most recent timestamp.
    pub fn parse_lines(text: &str) -> Self {
        let mut ledger = Self::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let Some(entry) = LedgerEntry::parse_line(line) else {
                debug!("Skipping ledger line {:?}", line);
                continue;
            };
            match ledger.entries.get(&entry.match_title) {
                Some(existing) if existing.last_notified_at >= entry.last_notified_at => {}
                _ => {
                    ledger.entries.insert(entry.match_title.clone(), entry);
                }
            }
        }
        ledger
    }

    /// Serialize as lines sorted by title
    pub fn to_lines(&self) -> String {
        self.entries
            .values()
            .map(LedgerEntry::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<LedgerEntry> for Ledger {
    fn from_iter<I: IntoIterator<Item = LedgerEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.match_title.clone(), entry))
                .collect(),
        }
    }
}
