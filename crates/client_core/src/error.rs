use shared::error::ApiError;
use thiserror::Error;

/// Coarse classes the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input caught before any request was sent.
    Validation,
    /// Missing, invalid or expired session token.
    Auth,
    /// Non-success status or transport failure.
    Request,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error("not signed in")]
    MissingSession,
    #[error("session rejected by server: {0}")]
    SessionRejected(ApiError),
    #[error("request failed: {0}")]
    Api(ApiError),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("session store failure: {source}")]
    Store { source: anyhow::Error },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::BlankField { .. } | ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::MissingSession | ClientError::SessionRejected(_) => ErrorKind::Auth,
            ClientError::Api(_)
            | ClientError::Transport(_)
            | ClientError::UnexpectedResponse(_)
            | ClientError::Store { .. } => ErrorKind::Request,
        }
    }

    /// Message the backend put in the error body, when there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api(api) | ClientError::SessionRejected(api) => api.server_message(),
            _ => None,
        }
    }

    pub(crate) fn store(source: anyhow::Error) -> Self {
        ClientError::Store { source }
    }
}
