use crate::config::SessionConfig;
use crate::context::{Deferred, EngineContext};
use crate::error::SessionError;
use crate::lifecycle::EventLifecycle;
use crate::scheduler;
use crate::session::{Session, SessionState};
use eventspace_common::{ParticipantId, SessionId};
use eventspace_kernel::WorldHost;
use eventspace_resources::{ReleaseOutcome, TimerSet};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A session together with the lifecycle instance and timers it owns.
pub(crate) struct SessionEntry {
    pub(crate) session: Session,
    pub(crate) lifecycle: Box<dyn EventLifecycle>,
    pub(crate) timers: TimerSet<Deferred>,
}

/// Tracks every live session.
///
/// Sessions are created `Pending`; the scheduler starts them. Terminated
/// sessions are removed only after their claims were released.
#[derive(Default)]
pub struct SessionRegistry {
    entries: BTreeMap<SessionId, SessionEntry>,
    next_seq: u64,
    max_sessions: Option<usize>,
    closed: bool,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.entries.len())
            .field("max_sessions", &self.max_sessions)
            .field("closed", &self.closed)
            .finish()
    }
}

impl SessionRegistry {
    /// An empty registry admitting at most `max_sessions` active sessions.
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            max_sessions,
            ..Self::default()
        }
    }

    /// Register a new pending session for `event_name`.
    ///
    /// Duplicate participants are collapsed. Nothing is registered when an
    /// error is returned.
    pub fn create<W: WorldHost>(
        &mut self,
        ctx: &EngineContext<W>,
        event_name: &str,
        participants: impl IntoIterator<Item = ParticipantId>,
        config: SessionConfig,
    ) -> Result<SessionId, SessionError> {
        if self.closed {
            return Err(SessionError::ShuttingDown);
        }
        let lifecycle = ctx
            .catalog
            .instantiate(event_name)
            .ok_or_else(|| SessionError::UnknownEvent(event_name.to_owned()))?;

        let mut members: Vec<ParticipantId> = Vec::new();
        for p in participants {
            if !members.contains(&p) {
                members.push(p);
            }
        }
        if members.is_empty() {
            return Err(SessionError::EmptyParticipantSet);
        }
        config.validate()?;
        if let Some(limit) = self.max_sessions {
            if self.active_count() >= limit {
                return Err(SessionError::CapacityExceeded { limit });
            }
        }
        for &participant in &members {
            if let Some(session) = self.session_of(participant) {
                return Err(SessionError::ParticipantBusy {
                    participant,
                    session,
                });
            }
        }

        let session = Session::new(event_name, members, config, self.next_seq);
        self.next_seq += 1;
        let id = session.id();
        info!(
            session = %id,
            event = event_name,
            participants = session.participants().len(),
            "session created"
        );
        self.entries.insert(
            id,
            SessionEntry {
                session,
                lifecycle,
                timers: TimerSet::new(),
            },
        );
        Ok(id)
    }

    /// The session `id`, if it is still registered.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.entries.get(&id).map(|e| &e.session)
    }

    /// Cancel a session: end hook (only if it was running), full release,
    /// removal. Returns `false`
    /// for unknown or already ending sessions.
    pub fn terminate<W: WorldHost>(
        &mut self,
        ctx: &mut EngineContext<W>,
        id: SessionId,
        reason: &str,
    ) -> bool {
        if !self.get(id).is_some_and(|s| s.state().is_active()) {
            debug!(session = %id, "terminate: no such active session");
            return false;
        }
        scheduler::run_ending(self, ctx, id, SessionState::Cancelled, reason, true).is_some()
    }

    /// Pending and running sessions, in creation order.
    pub fn list_active(&self) -> Vec<Session> {
        let mut active: Vec<Session> = self
            .entries
            .values()
            .filter(|e| e.session.state().is_active())
            .map(|e| e.session.clone())
            .collect();
        active.sort_by_key(|s| s.seq);
        active
    }

    /// Registered sessions, including any mid-ending.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The active session `participant` belongs to.
    pub fn session_of(&self, participant: ParticipantId) -> Option<SessionId> {
        self.entries
            .values()
            .find(|e| e.session.state().is_active() && e.session.contains(participant))
            .map(|e| e.session.id())
    }

    /// Take `participant` out of their session and give their inventory back.
    /// The session keeps running; with nobody left it is cancelled on the
    /// next tick.
    pub fn remove_participant<W: WorldHost>(
        &mut self,
        ctx: &mut EngineContext<W>,
        participant: ParticipantId,
    ) -> Option<SessionId> {
        let id = self.session_of(participant)?;
        self.drop_participant(ctx, id, participant);
        Some(id)
    }

    /// Whether the host should let `participant` break blocks. Participants
    /// outside any session are not restricted.
    pub fn allows_block_break(&self, participant: ParticipantId) -> bool {
        self.session_config_of(participant)
            .is_none_or(|c| c.can_break_blocks)
    }

    /// Whether the host should let `participant` place blocks.
    pub fn allows_block_place(&self, participant: ParticipantId) -> bool {
        self.session_config_of(participant)
            .is_none_or(|c| c.can_place_blocks)
    }

    /// Whether the registry refuses new sessions.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn session_config_of(&self, participant: ParticipantId) -> Option<&SessionConfig> {
        self.session_of(participant)
            .and_then(|id| self.get(id))
            .map(Session::config)
    }

    pub(crate) fn drop_participant<W: WorldHost>(
        &mut self,
        ctx: &mut EngineContext<W>,
        id: SessionId,
        participant: ParticipantId,
    ) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.session.participants.retain(|p| *p != participant);

        let (resources, mut cx) = ctx.resource_cx();
        match resources.release_participant(&mut cx, participant) {
            Some(ReleaseOutcome::Skipped(e)) => {
                warn!(session = %id, %participant, error = %e, "inventory not restored on departure")
            }
            Some(_) | None => {}
        }
        info!(
            session = %id,
            %participant,
            remaining = entry.session.participants.len(),
            "participant left session"
        );
    }

    pub(crate) fn entry_mut(&mut self, id: SessionId) -> Option<&mut SessionEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: SessionId) -> Option<SessionEntry> {
        self.entries.remove(&id)
    }

    /// Running sessions in creation order.
    pub(crate) fn running_ids(&self) -> Vec<SessionId> {
        let mut running: Vec<(u64, SessionId)> = self
            .entries
            .values()
            .filter(|e| e.session.state() == SessionState::Running)
            .map(|e| (e.session.seq, e.session.id()))
            .collect();
        running.sort();
        running.into_iter().map(|(_, id)| id).collect()
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    fn active_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.session.state().is_active())
            .count()
    }
}
