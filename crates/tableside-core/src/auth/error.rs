use std::sync::Arc;

use thiserror::Error;

/// Errors raised by the session manager.
///
/// Cloneable so one refresh outcome can be handed to every waiter.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("No access token stored - please log in")]
    NoToken,

    #[error("Token refresh failed (status {status}): {message}")]
    RefreshFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Token cannot be sent as a header: {0}")]
    InvalidHeader(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(Arc::new(err))
    }
}

impl SessionError {
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        SessionError::Storage(format!("{:#}", err))
    }
}
