//! Error types
//!
//! Decode and transport failures abort one polling cycle; extraction
//! failures only drop one bet; persistence failures degrade to empty state
//! on read and are logged on write.

use std::path::PathBuf;
use thiserror::Error;

/// Failures turning a polling response into a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no session id in handshake response")]
    NoSessionId,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("no bets/outcomes/odds block in payload")]
    BlockNotFound,
}

/// Failures building one bet from its definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("bet has no outcome list")]
    MissingOutcomes,

    #[error("missing or malformed cutoff: {0}")]
    MissingCutoff(String),

    #[error("missing price for outcome {0}")]
    MissingPrice(String),

    #[error("ladder has no priced tier")]
    EmptyLadder,
}

/// Snapshot and ledger I/O failures
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stored state: {0}")]
    Parse(String),
}

/// Transport collaborator failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid proxy url: {0}")]
    InvalidProxy(String),
}

impl TransportError {
    /// Network and proxy class failures that should not count against the
    /// consecutive failure budget
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(e) => {
                e.is_connect() || e.is_timeout() || mentions_proxy(&e.to_string())
            }
            TransportError::Status { status, body } => {
                matches!(status, 400 | 502 | 503 | 504) || mentions_proxy(body)
            }
            TransportError::Rejected(msg) => mentions_proxy(msg),
            TransportError::InvalidProxy(_) => true,
        }
    }
}

fn mentions_proxy(text: &str) -> bool {
    text.contains("proxy")
        || text.contains("Proxy")
        || text.contains("Bad Gateway")
        || text.contains("Bad Request")
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        WatchError::Transport(TransportError::Http(err))
    }
}

impl WatchError {
    /// Whether the failure is transient at the network/proxy level
    pub fn is_retryable(&self) -> bool {
        match self {
            WatchError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the failure only invalidates the current cycle's payload
    pub fn is_decode(&self) -> bool {
        matches!(self, WatchError::Decode(_))
    }

    /// Whether the failure counts against the consecutive failure budget
    ///
    /// A missing session id means the handshake itself failed; other decode
    /// errors only spoil one payload.
    pub fn counts_as_failure(&self) -> bool {
        match self {
            WatchError::Decode(DecodeError::NoSessionId) => true,
            WatchError::Decode(_) => false,
            other => !other.is_retryable(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
