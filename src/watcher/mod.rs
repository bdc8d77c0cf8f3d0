//! One polling cycle
//!
//! Open a session, subscribe to the sport route, decode the match list,
//! fetch each candidate match, then hand the snapshot to the diff engine.
//! A failing match is skipped; a failing sport document aborts the cycle.

#[cfg(test)]
mod tests;

use crate::client::{RequestSpec, SessionId, Transport};
use crate::config::Config;
use crate::decoder::{payload_root, FrameDecoder};
use crate::diff::{AlertSink, DiffEngine, DiffReport};
use crate::error::Result;
use crate::extractor::MarketExtractor;
use crate::storage::{self, FileLedgerStore, FileSnapshotStore, LedgerStore, SnapshotStore};
use crate::types::{Match, MatchId, Snapshot};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidate matches found in the sport document
    pub candidates: usize,
    /// Matches extracted successfully
    pub matches: usize,
    pub bets: usize,
    /// Candidates dropped by a fetch or decode failure
    pub skipped: usize,
    pub diff: DiffReport,
}

/// Matches collected by one pass over the transport
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub candidates: usize,
    pub skipped: usize,
    pub snapshot: Snapshot,
}

pub struct Watcher<S, L> {
    decoder: FrameDecoder,
    extractor: MarketExtractor,
    engine: DiffEngine<S, L>,
    sport_route: String,
    dump_dir: Option<PathBuf>,
}

impl Watcher<FileSnapshotStore, FileLedgerStore> {
    /// Watcher over the file stores named in the configuration
    pub fn from_config(config: &Config) -> Self {
        let engine = DiffEngine::with_retention_days(
            FileSnapshotStore::new(&config.storage.snapshot_path),
            FileLedgerStore::new(&config.storage.ledger_path),
            config.storage.ledger_retention_days,
        );
        Self::new(
            FrameDecoder::default(),
            MarketExtractor::from_config(&config.watch),
            engine,
            &config.watch.sport_route,
        )
        .with_dump_dir(config.storage.dump_dir.clone())
    }
}

impl<S, L> Watcher<S, L>
where
    S: SnapshotStore,
    L: LedgerStore,
{
    pub fn new(
        decoder: FrameDecoder,
        extractor: MarketExtractor,
        engine: DiffEngine<S, L>,
        sport_route: &str,
    ) -> Self {
        Self {
            decoder,
            extractor,
            engine,
            sport_route: sport_route.to_string(),
            dump_dir: None,
        }
    }

    /// Write raw response bodies under `dir`
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    pub fn engine(&self) -> &DiffEngine<S, L> {
        &self.engine
    }

    pub fn extractor(&self) -> &MarketExtractor {
        &self.extractor
    }

    /// Fetch and extract every candidate match
    pub async fn collect<T>(&self, transport: &T) -> Result<Collected>
    where
        T: Transport + ?Sized,
    {
        let session = transport.open_session().await?;
        debug!("Session {} open", session);

        let request_id = Uuid::new_v4().to_string();
        transport
            .fetch(&session, &RequestSpec::announce(&self.sport_route, &request_id))
            .await?;
        transport.fetch(&session, &RequestSpec::Poll).await?;

        let subscribe = RequestSpec::subscribe_data(
            &self.sport_route,
            Some(&request_id),
            Utc::now().timestamp_millis(),
        );
        transport.fetch(&session, &subscribe).await?;
        let body = transport.fetch(&session, &RequestSpec::Poll).await?;
        self.dump("sport_response.txt", &body).await;

        let document = self.decoder.decode(&body)?;
        let candidates = self.extractor.candidates(payload_root(&document)?)?;
        info!("🎾 {} candidate match(es)", candidates.len());

        let mut collected = Collected {
            candidates: candidates.len(),
            ..Default::default()
        };
        for (id, title) in candidates {
            match self.fetch_match(transport, &session, id, &title).await {
                Ok(m) => {
                    debug!("{}: {} bet(s)", m.title, m.bet_count());
                    collected.snapshot.push(m);
                }
                Err(e) => {
                    warn!("Skipping match {} ({}): {}", id, title, e);
                    collected.skipped += 1;
                }
            }
        }

        Ok(collected)
    }

    async fn fetch_match<T>(
        &self,
        transport: &T,
        session: &SessionId,
        id: MatchId,
        title: &str,
    ) -> Result<Match>
    where
        T: Transport + ?Sized,
    {
        let route = format!("match:{}", id);
        let subscribe = RequestSpec::subscribe_data(&route, None, Utc::now().timestamp_millis());
        transport.fetch(session, &subscribe).await?;

        let body = transport.fetch(session, &RequestSpec::Poll).await?;
        self.dump(&format!("match_{}.txt", id), &body).await;

        let document = self.decoder.decode(&body)?;
        Ok(self.extractor.extract_match(id, title, &document)?)
    }

    /// Collect, then diff against stored state and alert
    pub async fn run_cycle<T, A>(
        &self,
        transport: &T,
        alerts: &A,
        now: DateTime<Utc>,
    ) -> Result<CycleReport>
    where
        T: Transport + ?Sized,
        A: AlertSink + ?Sized,
    {
        let collected = self.collect(transport).await?;
        let diff = self.engine.run_cycle(&collected.snapshot, alerts, now).await;

        Ok(CycleReport {
            candidates: collected.candidates,
            matches: collected.snapshot.len(),
            bets: collected.snapshot.iter().map(Match::bet_count).sum(),
            skipped: collected.skipped,
            diff,
        })
    }

    async fn dump(&self, name: &str, body: &[u8]) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        if let Err(e) = storage::write_atomic(&dir.join(name), body).await {
            warn!("Failed to dump {}: {}", name, e);
        }
    }
}
