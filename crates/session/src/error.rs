use eventspace_common::{ParticipantId, SessionId};
use eventspace_resources::ResourceError;

/// Errors returned synchronously by session operations. None of them leave
/// partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no event named {0:?} is registered")]
    UnknownEvent(String),
    #[error("a session needs at least one participant")]
    EmptyParticipantSet,
    #[error("participant {participant} is already in session {session}")]
    ParticipantBusy {
        participant: ParticipantId,
        session: SessionId,
    },
    #[error("session limit of {limit} reached")]
    CapacityExceeded { limit: usize },
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("engine is shutting down")]
    ShuttingDown,
}

/// Failure inside a lifecycle hook or deferred callback.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
