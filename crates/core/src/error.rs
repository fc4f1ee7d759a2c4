//! Unified error types for cachefirst.
//!
//! Every message carries a stable code prefix so failures surfaced through an
//! error handler can be matched on without inspecting variants.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the transport and the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network call itself failed.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP_ERROR: status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// The response body could not be decoded for the requested extraction.
    #[error("DECODE_FAILED: {0}")]
    Decode(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Small-value store could not be read or written.
    #[error("CACHE_ERROR: {0}")]
    Storage(String),
}

impl Error {
    /// Whether this error came from the network side of a fetch.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::HttpStatus { .. } | Error::FetchTooLarge(_))
    }

    /// Whether this error came from a persistent storage backend.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_) | Error::Storage(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(format!("io: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("serialization: {err}"))
    }
}
