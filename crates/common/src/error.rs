//! Error types shared across liverec crates.
//!
//! Every failure the engine can observe is classified into an [`ErrorKind`].
//! Retry and backoff decisions are made on the kind alone, never on the
//! concrete variant or its message.

/// Coarse classification driving retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The target exists but is not broadcasting.
    TargetNotLive,
    /// The target is live but no playable URL could be resolved.
    LiveUrlUnresolvable,
    /// A network or protocol blip while streaming.
    TransientStreamError,
    /// The connection to the platform was lost.
    ConnectionLost,
    /// Anything else.
    UnexpectedFailure,
}

impl ErrorKind {
    /// Expected conditions are logged at info level, never as errors.
    pub fn is_expected(self) -> bool {
        matches!(self, Self::TargetNotLive | Self::LiveUrlUnresolvable)
    }
}

/// Top-level error type for liverec operations.
#[derive(Debug, thiserror::Error)]
pub enum LiverecError {
    #[error("@{target}: user is not currently live")]
    TargetNotLive { target: String },

    #[error("@{target}: unable to retrieve the live streaming url")]
    LiveUrlUnresolvable { target: String },

    #[error("Transient stream error: {message}")]
    TransientStream { message: String },

    #[error("Connection lost: {message}")]
    ConnectionLost { message: String },

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Post-processing error: {message}")]
    PostProcess { message: String },

    #[error("Region blocked: {message}")]
    RegionBlocked { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LiverecError.
pub type LiverecResult<T> = Result<T, LiverecError>;

impl LiverecError {
    pub fn not_live(target: impl Into<String>) -> Self {
        Self::TargetNotLive {
            target: target.into(),
        }
    }

    pub fn url_unresolvable(target: impl Into<String>) -> Self {
        Self::LiveUrlUnresolvable {
            target: target.into(),
        }
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientStream {
            message: msg.into(),
        }
    }

    pub fn connection_lost(msg: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: msg.into(),
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification {
            message: msg.into(),
        }
    }

    pub fn post_process(msg: impl Into<String>) -> Self {
        Self::PostProcess {
            message: msg.into(),
        }
    }

    pub fn region_blocked(msg: impl Into<String>) -> Self {
        Self::RegionBlocked {
            message: msg.into(),
        }
    }

    /// Classify this error for the retry policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TargetNotLive { .. } => ErrorKind::TargetNotLive,
            Self::LiveUrlUnresolvable { .. } => ErrorKind::LiveUrlUnresolvable,
            Self::TransientStream { .. } => ErrorKind::TransientStreamError,
            Self::ConnectionLost { .. } => ErrorKind::ConnectionLost,
            _ => ErrorKind::UnexpectedFailure,
        }
    }
}
