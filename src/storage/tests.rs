//! Unit tests for durable stores and the ledger model

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::types::{Bet, Match};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn retention() -> Duration {
        Duration::days(7)
    }

    fn sample_match() -> Match {
        Match {
            title: "C. Alcaraz - J. Sinner".to_string(),
            link: "https://example.com/match/501".to_string(),
            bets: vec![Bet::Simple {
                type_name: "Nombre d'aces".to_string(),
                cutoff: 15.5,
                over_price: 1.85,
                under_price: 1.95,
            }],
        }
    }

    // ---- ledger model ----

    #[test]
    fn test_ledger_ttl_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.record("Old", "l1", now - Duration::days(8));
        ledger.record("Recent", "l2", now - Duration::days(6));

        assert!(!ledger.is_suppressed("Old", now, retention()));
        assert!(ledger.is_suppressed("Recent", now, retention()));
        assert!(!ledger.is_suppressed("Never", now, retention()));
    }

    #[test]
    fn test_ledger_exactly_at_retention_is_live() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.record("Edge", "l", now - Duration::days(7));
        assert!(ledger.is_suppressed("Edge", now, retention()));
    }

    #[test]
    fn test_ledger_prune() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.record("Old", "l1", now - Duration::days(10));
        ledger.record("Recent", "l2", now - Duration::hours(1));

        assert_eq!(ledger.prune(now, retention()), 1);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get("Old").is_none());
        assert!(ledger.get("Recent").is_some());
    }

    #[test]
    fn test_ledger_line_format_sorted_by_title() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 10, 12, 30, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.record("B - C", "https://x/2", ts);
        ledger.record("A - B", "", ts);

        assert_eq!(
            ledger.to_lines(),
            "2025-06-10T12:30:00Z|A - B|unknown\n2025-06-10T12:30:00Z|B - C|https://x/2"
        );
    }

    #[test]
    fn test_ledger_parse_lines() {
        let text = "\
2025-06-10T12:30:00Z|A - B|https://x/1\r
not a ledger line
garbage|A - B|x

2025-06-09T08:00:00+02:00|C - D
2025-06-11T00:00:00Z|E | F - G|https://x/3
";
        let ledger = Ledger::parse_lines(text);
        assert_eq!(ledger.len(), 3);

        let a = ledger.get("A - B").unwrap();
        assert_eq!(a.last_known_link, "https://x/1");
        assert_eq!(
            a.last_notified_at,
            Utc.with_ymd_and_hms(2025, 6, 10, 12, 30, 0).unwrap()
        );

        let c = ledger.get("C - D").unwrap();
        assert_eq!(c.last_known_link, UNKNOWN_LINK);
        assert_eq!(
            c.last_notified_at,
            Utc.with_ymd_and_hms(2025, 6, 9, 6, 0, 0).unwrap()
        );

        assert_eq!(ledger.get("E | F - G").unwrap().last_known_link, "https://x/3");
    }

    #[test]
    fn test_ledger_parse_keeps_latest_duplicate() {
        let text = "2025-06-10T00:00:00Z|A - B|new\n2025-06-01T00:00:00Z|A - B|old";
        let ledger = Ledger::parse_lines(text);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("A - B").unwrap().last_known_link, "new");
    }

    // ---- file stores ----

    #[tokio::test]
    async fn test_snapshot_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_store_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("snapshot.json");
        let store = FileSnapshotStore::new(&path);

        let snapshot = vec![sample_match()];
        store.save(&snapshot).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("state").join("snapshot.json.tmp").exists());
        assert_eq!(store.load().await.unwrap(), snapshot);

        // overwritten wholesale
        store.save(&Vec::new()).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_store_corrupt_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        tokio::fs::write(&path, "[{not json").await.unwrap();

        let store = FileSnapshotStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_snapshot_store_read_error() {
        let dir = tempdir().unwrap();
        // a directory cannot be read as a file
        let store = FileSnapshotStore::new(dir.path());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
    }

    #[tokio::test]
    async fn test_ledger_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sent.txt");
        let store = FileLedgerStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());

        let ts = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let mut ledger = Ledger::new();
        ledger.record("C. Alcaraz - J. Sinner", "https://x/501", ts);
        store.save(&ledger).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text, "2025-06-10T12:00:00Z|C. Alcaraz - J. Sinner|https://x/501");
        assert_eq!(store.load().await.unwrap(), ledger);
    }
}
