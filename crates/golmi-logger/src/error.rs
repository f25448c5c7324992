//! Error types for the session logger.
//!
//! Neither failure kind is fatal. A reserved-key violation is returned to
//! the caller of [`add_data`](crate::SessionLogger::add_data); upload
//! failures never leave the spawned upload task and only surface as
//! diagnostics.

/// Errors produced by the session logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Auxiliary data was offered under the key that holds the log.
    #[error("auxiliary key \"{key}\" is reserved for the snapshot log")]
    ReservedKey {
        /// The rejected key.
        key: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The upload request never got a response.
    #[error("upload to {url} failed: {source}")]
    Transport {
        /// Target URL.
        url: String,
        /// The underlying reqwest error.
        source: reqwest::Error,
    },

    /// The upload endpoint answered with a non-success status.
    #[error("upload to {url} rejected with status {status}")]
    Status {
        /// Target URL.
        url: String,
        /// Status returned by the endpoint.
        status: reqwest::StatusCode,
    },

    /// The export object could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing an exported log to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
