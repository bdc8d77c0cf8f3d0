//! Tests for error classification

#[cfg(test)]
mod tests {
    use super::super::error::*;

    #[test]
    fn test_status_gateway_errors_are_retryable() {
        for status in [502u16, 503, 504, 400] {
            let err = TransportError::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "status {} should be retryable", status);
        }
    }

    #[test]
    fn test_status_forbidden_is_not_retryable() {
        let err = TransportError::Status {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_proxy_message_is_retryable() {
        let err = TransportError::Rejected("Proxy authentication required".to_string());
        assert!(err.is_retryable());

        let err = TransportError::Rejected("subscription not acknowledged".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_watch_error_retryable_only_for_transport() {
        let transport: WatchError = TransportError::Status {
            status: 503,
            body: String::new(),
        }
        .into();
        assert!(transport.is_retryable());

        let decode: WatchError = DecodeError::NoSessionId.into();
        assert!(!decode.is_retryable());
        assert!(decode.is_decode());
    }

    #[test]
    fn test_failure_budget_classification() {
        let proxy: WatchError = TransportError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        }
        .into();
        assert!(!proxy.counts_as_failure());

        let malformed: WatchError = DecodeError::MalformedPayload("eof".to_string()).into();
        assert!(!malformed.counts_as_failure());

        let no_sid: WatchError = DecodeError::NoSessionId.into();
        assert!(no_sid.counts_as_failure());

        let rejected: WatchError =
            TransportError::Rejected("subscription not acknowledged".to_string()).into();
        assert!(rejected.counts_as_failure());

        assert!(WatchError::Notify("down".to_string()).counts_as_failure());
    }

    #[test]
    fn test_decode_error_display() {
        assert_eq!(
            DecodeError::NoSessionId.to_string(),
            "no session id in handshake response"
        );
        assert_eq!(
            DecodeError::UnexpectedShape("root is not an object".to_string()).to_string(),
            "unexpected payload shape: root is not an object"
        );
    }

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::MissingPrice("1234".to_string());
        assert_eq!(err.to_string(), "missing price for outcome 1234");
    }
}
