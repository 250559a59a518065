//! Error type shared by the store, the chat client, and the router.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt JSON document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API returned {status}: {body}")]
    ChatApi { status: u16, body: String },
    #[error("chat reply was not valid JSON: {0}")]
    ChatReply(serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("transport error: {0}")]
    Transport(String),
}

impl HubError {
    /// True for failures of the external chat endpoint: network, non-2xx, or an unreadable reply.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            HubError::Http(_) | HubError::ChatApi { .. } | HubError::ChatReply(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
