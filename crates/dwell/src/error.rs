//! Error types at the crate's seams.
//!
//! Only failures that end a session or come back from the durable store get
//! typed errors. Model transport errors stay `String`s (see
//! [`api::retry`](crate::api::retry) for why), and tool failures are plain
//! text the model reads in its next turn.

/// Errors that end a session early.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A wake was requested while this agent already has a session running.
    #[error("agent {0} already has a session in flight")]
    AlreadyRunning(String),

    /// The configured start room is not registered.
    #[error("start room '{0}' is not registered")]
    UnknownStartRoom(String),

    /// The main turn call to the model failed.
    #[error("model call failed on turn {turn}: {message}")]
    Llm { turn: u32, message: String },

    /// Summarization failed. Carrying on would desynchronize the
    /// transcript from the durable sequence numbering.
    #[error("compaction failed on turn {turn}: {message}")]
    Compaction { turn: u32, message: String },
}

/// Errors returned by [`TranscriptStore`](crate::store::TranscriptStore)
/// implementations. The turn loop logs these and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session {0} is already sealed")]
    SessionSealed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_display() {
        let err = SessionError::Compaction {
            turn: 7,
            message: "HTTP 500".into(),
        };
        assert_eq!(err.to_string(), "compaction failed on turn 7: HTTP 500");
        assert!(
            SessionError::AlreadyRunning("ada".into())
                .to_string()
                .contains("ada")
        );
    }

    #[test]
    fn store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}
