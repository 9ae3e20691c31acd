//! Protocol error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Protocol error type.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Channel closed")]
    ChannelClosed,
}

impl From<tungstenite::Error> for ProtocolError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            other => Self::WebSocket(Box::new(other)),
        }
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
