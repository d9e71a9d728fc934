//! Errors surfaced by payment watching and storefront calls.

use thiserror::Error;

/// Default message when the server rejects a request without saying why.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Failed to process the request.";

/// Errors that can occur while talking to the storefront.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The request could not complete (connect, timeout, body read).
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    /// The server answered successfully but the body could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The client configuration cannot be turned into requests.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No Pix copy-paste code is available for the current order.
    #[error("Pix code unavailable")]
    PixCodeUnavailable,

    /// The operation needs a current order and there is none.
    #[error("No active order")]
    NoActiveOrder,
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        WatchError::NetworkFailure(err.to_string())
    }
}

/// Result type for storefront operations.
pub type WatchResult<T> = Result<T, WatchError>;
