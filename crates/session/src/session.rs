use crate::config::SessionConfig;
use eventspace_common::{ParticipantId, SessionId, Timestamp};
use serde::Serialize;

/// Lifecycle state of a session.
///
/// `Pending -> Running -> Ending -> Ended | Cancelled`. A session may also
/// go straight from `Pending` to `Ending` when its start hook fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Pending,
    Running,
    Ending,
    Ended,
    Cancelled,
}

impl SessionState {
    /// Pending or running: the session still owns its participants.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

/// One running instance of an event.
///
/// Only the registry and scheduler mutate a session; everything else reads
/// it through these accessors.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) event_name: String,
    pub(crate) participants: Vec<ParticipantId>,
    pub(crate) state: SessionState,
    pub(crate) config: SessionConfig,
    pub(crate) elapsed: u64,
    pub(crate) created_at: Timestamp,
    pub(crate) seq: u64,
    pub(crate) end_reason: Option<String>,
}

impl Session {
    pub(crate) fn new(
        event_name: impl Into<String>,
        participants: Vec<ParticipantId>,
        config: SessionConfig,
        seq: u64,
    ) -> Self {
        Self {
            id: SessionId::new(),
            event_name: event_name.into(),
            participants,
            state: SessionState::Pending,
            config,
            elapsed: 0,
            created_at: eventspace_common::now(),
            seq,
            end_reason: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// External ticks this session has been running.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn remaining(&self) -> u64 {
        self.config.duration_ticks.saturating_sub(self.elapsed)
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_pending() {
        let p = ParticipantId::new();
        let s = Session::new("race", vec![p], SessionConfig::new(5, 50), 0);
        assert_eq!(s.state(), SessionState::Pending);
        assert!(s.state().is_active());
        assert!(s.contains(p));
        assert_eq!(s.remaining(), 50);
    }

    #[test]
    fn state_classification() {
        assert!(SessionState::Running.is_active());
        assert!(!SessionState::Ending.is_active());
        assert!(!SessionState::Ending.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Ended.is_terminal());
    }
}
