//! Unit tests for the cycle pipeline

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::decoder::encode_message_frame;
    use crate::error::{DecodeError, TransportError, WatchError};
    use crate::testing::{MemoryLedgerStore, MemorySnapshotStore, RecordingAlertSink, ScriptedTransport};
    use serde_json::json;

    fn watcher() -> Watcher<MemorySnapshotStore, MemoryLedgerStore> {
        Watcher::new(
            FrameDecoder::default(),
            MarketExtractor::new("nombre d'aces", 548, "https://example.com/match"),
            DiffEngine::with_retention_days(MemorySnapshotStore::new(), MemoryLedgerStore::new(), 7),
            "sport:5",
        )
    }

    fn sport_body() -> String {
        let payload = json!({
            "matches": {
                "501": {"matchId": 501, "title": "C. Alcaraz - J. Sinner", "filters": [548]},
                "502": {"matchId": 502, "title": "Doubles", "filters": [12]},
                "508": {"matchId": 508, "title": "A. Zverev - D. Medvedev", "filters": [3, 548]}
            }
        });
        format!("2:40{}", encode_message_frame(&payload))
    }

    fn match_body() -> String {
        let status = json!({"status": "live"});
        let block = json!({
            "bets": {
                "1": {
                    "betTypeName": "Nombre d'aces",
                    "specialBetValue": "total=15.5",
                    "outcomes": [10, 11]
                },
                "2": {"betTypeName": "Vainqueur", "outcomes": [12, 13]}
            },
            "outcomes": {
                "10": {"label": "Plus"}, "11": {"label": "Moins"}
            },
            "odds": {"10": 1.83, "11": 1.96, "12": 1.5, "13": 2.5}
        });
        format!("{}{}", encode_message_frame(&status), encode_message_frame(&block))
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[tokio::test]
    async fn test_cycle_collects_and_alerts() {
        let transport = ScriptedTransport::new("sid-1");
        transport
            .push_poll("2:40")
            .push_poll(sport_body())
            .push_poll(match_body())
            .push_poll("1:6");

        let watcher = watcher();
        let sink = RecordingAlertSink::new();
        let report = watcher.run_cycle(&transport, &sink, now()).await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.matches, 1);
        assert_eq!(report.bets, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.diff.alerts_sent, 1);

        let text = &sink.messages()[0];
        assert!(text.contains("<b>Nombre d'aces</b>  + 15.5 @ 1.85 / - 15.5 @ 1.95"));
        assert!(text.contains("https://example.com/match/501"));

        assert_eq!(
            transport.subscribed_routes(),
            vec!["sport:5", "sport:5", "match:501", "match:508"]
        );
    }

    #[tokio::test]
    async fn test_cycle_request_sequence() {
        let transport = ScriptedTransport::new("sid-1");
        transport.push_poll("2:40").push_poll(sport_body());
        let watcher = watcher();
        watcher.collect(&transport).await.unwrap();

        let requests = transport.requests();
        assert!(matches!(
            &requests[0],
            RequestSpec::Subscribe { route, request_id: Some(_), data: false, .. } if route == "sport:5"
        ));
        assert_eq!(requests[1], RequestSpec::Poll);
        match (&requests[0], &requests[2]) {
            (
                RequestSpec::Subscribe { request_id: first, .. },
                RequestSpec::Subscribe { request_id: second, data: true, menu: true, client_time: Some(_), .. },
            ) => assert_eq!(first, second),
            other => panic!("Unexpected requests {:?}", other),
        }
        assert_eq!(requests[3], RequestSpec::Poll);
        assert!(matches!(
            &requests[4],
            RequestSpec::Subscribe { route, request_id: None, .. } if route == "match:501"
        ));
    }

    #[tokio::test]
    async fn test_second_cycle_is_silent() {
        let watcher = watcher();
        let sink = RecordingAlertSink::new();

        for _ in 0..2 {
            let transport = ScriptedTransport::new("sid");
            transport
                .push_poll("2:40")
                .push_poll(sport_body())
                .push_poll(match_body())
                .push_poll(match_body());
            watcher.run_cycle(&transport, &sink, now()).await.unwrap();
        }

        // 501 and 508 alert once each on the first cycle only
        assert_eq!(sink.count(), 2);
        assert_eq!(watcher.engine().snapshot_store().current().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_matches_aborts_cycle() {
        let transport = ScriptedTransport::new("sid");
        transport
            .push_poll("2:40")
            .push_poll(encode_message_frame(&json!({"menu": {}})));

        let err = watcher()
            .run_cycle(&transport, &RecordingAlertSink::new(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, WatchError::Decode(DecodeError::UnexpectedShape(_))));
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_no_session_aborts_cycle() {
        let transport = ScriptedTransport::without_session();
        let err = watcher().collect(&transport).await.unwrap_err();
        assert!(matches!(err, WatchError::Decode(DecodeError::NoSessionId)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = ScriptedTransport::new("sid");
        transport.push_poll_error(
            TransportError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            }
            .into(),
        );

        let err = watcher().collect(&transport).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_dump_dir_receives_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new("sid");
        transport
            .push_poll("2:40")
            .push_poll(sport_body())
            .push_poll(match_body());

        let watcher = watcher().with_dump_dir(Some(dir.path().to_path_buf()));
        watcher.collect(&transport).await.unwrap();

        let sport = tokio::fs::read_to_string(dir.path().join("sport_response.txt"))
            .await
            .unwrap();
        assert_eq!(sport, sport_body());
        assert!(dir.path().join("match_501.txt").exists());
    }

    #[tokio::test]
    async fn test_mock_transport_open_failure() {
        let mut transport = crate::client::MockTransport::new();
        transport
            .expect_open_session()
            .times(1)
            .returning(|| Err(TransportError::Rejected("proxy refused".to_string()).into()));
        transport.expect_fetch().never();

        let err = watcher().collect(&transport).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
