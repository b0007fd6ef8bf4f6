//! Backend client error types.

use thiserror::Error;

/// Errors raised by backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or decoding failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{endpoint} returned status {status}")]
    Status {
        /// Endpoint path that failed.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },
}
