use std::time::Duration;

/// Everything that can go wrong on the sync path.
///
/// None of these reach the UI: the orchestrator and the outbox log them and
/// carry on with whatever state they already have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Malformed local blob or remote payload.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("remote read timed out after {}ms", .0.as_millis())]
    RemoteTimeout(Duration),

    /// Script load failure, HTTP failure, or a response with `ok != true`.
    #[error("remote transport error: {0}")]
    RemoteTransport(String),

    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    #[error("local storage error: {0}")]
    Storage(String),

    /// The pending read was released before a response arrived.
    #[error("remote read cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self::Parse(e.to_string())
    }

    pub(crate) fn transport(e: impl std::fmt::Display) -> Self {
        Self::RemoteTransport(e.to_string())
    }

    pub(crate) fn write(e: impl std::fmt::Display) -> Self {
        Self::RemoteWrite(e.to_string())
    }

    pub(crate) fn storage(e: impl std::fmt::Debug) -> Self {
        Self::Storage(format!("{e:?}"))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RemoteTimeout(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
