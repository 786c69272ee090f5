use std::{fmt, path::PathBuf};
use thiserror::Error;

/// The only failure the identity backend reports. Network errors, rejected
/// addresses and provider rate limits all arrive as this one kind.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub struct RequestFailed {
    pub description: Option<String>,
    pub message: String,
}

impl RequestFailed {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            description: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Text shown to the user: the description when the backend sent one,
    /// otherwise the message.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => description,
            _ => &self.message,
        }
    }
}

impl fmt::Display for RequestFailed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.user_message())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage contents")]
    Json(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no email for this sign-in; pass the address used to request the link")]
    MissingEmail,
    #[error("not a sign-in link: {0}")]
    InvalidLink(String),
    #[error(transparent)]
    Request(#[from] RequestFailed),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatcherError {
    #[error("session watcher already started")]
    AlreadyStarted,
}
