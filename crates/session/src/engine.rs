use crate::config::{EngineSettings, SessionConfig};
use crate::context::EngineContext;
use crate::coordinator::{DisableCoordinator, ShutdownReport};
use crate::error::SessionError;
use crate::lifecycle::EventCatalog;
use crate::registry::SessionRegistry;
use crate::scheduler::{EventScheduler, TickReport};
use crate::session::Session;
use crate::telemetry::SessionObserver;
use eventspace_common::{BlockKind, BlockPos, ParticipantId, SessionId};
use eventspace_kernel::WorldHost;
use eventspace_persist::{PersistQueue, RecordStore};
use eventspace_resources::{ResourceError, ResourceManagers};

/// The engine a host embeds: registry, scheduler and shared context behind
/// one API, driven by [`EventEngine::tick`] from the host's tick thread.
///
/// Dropping an engine with active sessions shuts it down first, so their
/// world changes are still reverted.
pub struct EventEngine<W: WorldHost> {
    ctx: EngineContext<W>,
    registry: SessionRegistry,
    scheduler: EventScheduler,
}

impl<W: WorldHost> EventEngine<W> {
    /// An engine over `world` with no sessions yet.
    pub fn new(
        world: W,
        store: Box<dyn RecordStore>,
        catalog: EventCatalog,
        settings: EngineSettings,
    ) -> Self {
        let registry = SessionRegistry::new(settings.max_sessions);
        Self {
            ctx: EngineContext::new(world, store, catalog, settings),
            registry,
            scheduler: EventScheduler::new(),
        }
    }

    /// Report lifecycle events to `observer`.
    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.ctx.set_observer(Box::new(observer));
        self
    }

    /// Create and start a session. The returned session is already running,
    /// or was cancelled if its start hook failed.
    pub fn create(
        &mut self,
        event_name: &str,
        participants: impl IntoIterator<Item = ParticipantId>,
        config: SessionConfig,
    ) -> Result<SessionId, SessionError> {
        let id = self
            .registry
            .create(&self.ctx, event_name, participants, config)?;
        self.scheduler.start(&mut self.registry, &mut self.ctx, id);
        Ok(id)
    }

    /// Like [`create`](Self::create), with the configuration from the engine
    /// settings for `event_name`.
    pub fn create_configured(
        &mut self,
        event_name: &str,
        participants: impl IntoIterator<Item = ParticipantId>,
    ) -> Result<SessionId, SessionError> {
        let config = self.ctx.settings.session_config(event_name);
        self.create(event_name, participants, config)
    }

    /// Cancel a session. Unknown ids are a no-op returning `false`.
    pub fn terminate(&mut self, id: SessionId, reason: &str) -> bool {
        self.registry.terminate(&mut self.ctx, id, reason)
    }

    /// The registered session `id`.
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.registry.get(id)
    }

    /// Like `get`, but an unknown id is an error.
    pub fn session(&self, id: SessionId) -> Result<&Session, SessionError> {
        self.registry.get(id).ok_or(SessionError::SessionNotFound(id))
    }

    /// Pending and running sessions, in creation order.
    pub fn list_active(&self) -> Vec<Session> {
        self.registry.list_active()
    }

    /// The active session `participant` belongs to.
    pub fn session_of(&self, participant: ParticipantId) -> Option<SessionId> {
        self.registry.session_of(participant)
    }

    /// The host reports a participant leaving; their inventory is restored
    /// right away.
    pub fn participant_left(&mut self, participant: ParticipantId) -> Option<SessionId> {
        self.registry.remove_participant(&mut self.ctx, participant)
    }

    /// Whether `participant` may break blocks.
    pub fn allows_block_break(&self, participant: ParticipantId) -> bool {
        self.registry.allows_block_break(participant)
    }

    /// Whether `participant` may place blocks.
    pub fn allows_block_place(&self, participant: ParticipantId) -> bool {
        self.registry.allows_block_place(participant)
    }

    /// Apply a block change made by a participant.
    ///
    /// Outside a session this returns `Ok(false)` and leaves the world alone;
    /// the host applies the change itself. Inside one, the change is checked
    /// against the session's permissions and claimed so it is reverted at
    /// the end.
    pub fn participant_block_change(
        &mut self,
        participant: ParticipantId,
        pos: BlockPos,
        kind: BlockKind,
    ) -> Result<bool, ResourceError> {
        let Some(session) = self.registry.session_of(participant) else {
            return Ok(false);
        };
        let allowed = if kind.is_air() {
            self.registry.allows_block_break(participant)
        } else {
            self.registry.allows_block_place(participant)
        };
        if !allowed {
            let action = if kind.is_air() { "break" } else { "place" };
            return Err(ResourceError::NotPermitted { pos, action });
        }
        let (resources, mut cx) = self.ctx.resource_cx();
        resources.set_block(&mut cx, session, pos, kind)?;
        Ok(true)
    }

    /// Advance every running session by one external tick.
    pub fn tick(&mut self) -> TickReport {
        self.scheduler.tick(&mut self.registry, &mut self.ctx)
    }

    /// Terminate everything and release every claim. Later `create` calls
    /// fail with [`SessionError::ShuttingDown`].
    pub fn shutdown(&mut self) -> ShutdownReport {
        DisableCoordinator::shutdown(&mut self.registry, &mut self.ctx)
    }

    /// Hook errors and panics contained so far.
    pub fn hook_failures(&self) -> u64 {
        self.scheduler.hook_failures()
    }

    /// The engine's tick counter.
    pub fn current_tick(&self) -> u64 {
        self.ctx.tick()
    }

    /// The shared engine state.
    pub fn context(&self) -> &EngineContext<W> {
        &self.ctx
    }

    /// The world being driven.
    pub fn world(&self) -> &W {
        self.ctx.world()
    }

    /// Direct world access for the host, e.g. to simulate players.
    pub fn world_mut(&mut self) -> &mut W {
        self.ctx.world_mut()
    }

    /// The resource managers and their ledger.
    pub fn resources(&self) -> &ResourceManagers {
        self.ctx.resources()
    }

    /// The pending record writes.
    pub fn persistence(&self) -> &PersistQueue {
        self.ctx.persistence()
    }

    /// Mutable access to the pending record writes.
    pub fn persistence_mut(&mut self) -> &mut PersistQueue {
        self.ctx.persistence_mut()
    }
}

impl<W: WorldHost> Drop for EventEngine<W> {
    fn drop(&mut self) {
        if !self.registry.is_empty() || !self.ctx.resources.ledger().is_empty() {
            tracing::warn!("engine dropped with live sessions, shutting down");
            self.shutdown();
        }
    }
}
