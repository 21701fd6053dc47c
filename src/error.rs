use thiserror::Error;

/// Failures crossing the store's two outer seams: the remote collection and the local cache.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote request did not complete, or completed with a non-success status.
    #[error("{operation} failed: {message}")]
    Transport { operation: &'static str, message: String },

    /// A stored or remote payload did not have the expected shape.
    #[error("could not decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SyncError {
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport { operation, message: message.into() }
    }

    pub fn decode(what: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { what, source }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
