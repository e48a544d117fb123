use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the bridge before or while it is running.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to subscribe SSE at {url}: {source}")]
    Subscribe {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to subscribe SSE at {url}: HTTP {status}")]
    SubscribeStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to open traffic log at {path:?}: {source}")]
    TrafficLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session handshake closed before an endpoint was announced")]
    HandshakeClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a single message submission. The upstream loop reports these
/// and moves on to the next line.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("error POSTing to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error POSTing to {url}: HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}
