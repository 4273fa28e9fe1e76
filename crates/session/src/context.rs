use crate::config::{EngineSettings, SessionConfig};
use crate::error::HookError;
use crate::lifecycle::EventCatalog;
use crate::session::Session;
use crate::telemetry::{NoopObserver, SessionObserver};
use eventspace_common::{ActorSpawn, BlockKind, BlockPos, Inventory, ParticipantId, SessionId};
use eventspace_kernel::{ProjectileLaunch, WorldHost};
use eventspace_persist::{ParticipantRecord, PersistQueue, Record, RecordStore, WorldRecord};
use eventspace_resources::{
    ActorHandle, BlockHandle, ClaimRef, ContainerHandle, ContainerSpec, InventoryHandle,
    InventorySpec, ProjectileHandle, ProjectileSpec, ReleaseOutcome, ResourceCx, ResourceError,
    ResourceManagers, TimerId, TimerSet,
};

/// A callback scheduled by a hook, run on the tick thread when due.
pub type Deferred = Box<dyn FnOnce(&mut EventContext<'_>) -> Result<(), HookError>>;

/// Everything the engine owns besides the session registry.
pub struct EngineContext<W: WorldHost> {
    pub(crate) world: W,
    pub(crate) resources: ResourceManagers,
    pub(crate) persistence: PersistQueue,
    pub(crate) observer: Box<dyn SessionObserver>,
    pub(crate) catalog: EventCatalog,
    pub(crate) settings: EngineSettings,
    pub(crate) tick: u64,
}

impl<W: WorldHost> EngineContext<W> {
    /// Build the context and make sure the world record exists.
    pub fn new(
        world: W,
        store: Box<dyn RecordStore>,
        catalog: EventCatalog,
        settings: EngineSettings,
    ) -> Self {
        let mut persistence = PersistQueue::new(store);
        let key = WorldRecord::key_for(&settings.world_name);
        let record = match persistence.get_record::<WorldRecord>(&key) {
            Some(mut existing) => {
                existing.last_modified = eventspace_common::now();
                existing
            }
            None => WorldRecord::new(settings.world_name.clone()),
        };
        tracing::info!(world = %record.world_name, id = %record.world_id, "world record ready");
        persistence.put_record(&record);
        persistence.flush();

        Self {
            world,
            resources: ResourceManagers::new(),
            persistence,
            observer: Box::new(NoopObserver),
            catalog,
            settings,
            tick: 0,
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn resources(&self) -> &ResourceManagers {
        &self.resources
    }

    pub fn persistence(&self) -> &PersistQueue {
        &self.persistence
    }

    pub fn persistence_mut(&mut self) -> &mut PersistQueue {
        &mut self.persistence
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// External ticks processed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn set_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observer = observer;
    }

    /// Split into the resource managers and the collaborators they act on.
    pub(crate) fn resource_cx(&mut self) -> (&mut ResourceManagers, ResourceCx<'_>) {
        (
            &mut self.resources,
            ResourceCx {
                world: &mut self.world,
                records: &mut self.persistence,
                tick: self.tick,
            },
        )
    }

    /// Bump the participation counter of every participant.
    pub(crate) fn count_participation(&mut self, participants: &[ParticipantId]) {
        for &participant in participants {
            let key = ParticipantRecord::key_for(participant);
            let mut record = self
                .persistence
                .get_record::<ParticipantRecord>(&key)
                .unwrap_or_else(|| ParticipantRecord::new(participant));
            record.events_participated += 1;
            self.persistence.put_record(&record);
        }
    }
}

/// The handle a hook uses to act on the world for its session.
///
/// Every mutation goes through the resource managers, so it is claimed by
/// this session and reverted when the session ends.
pub struct EventContext<'a> {
    session: &'a Session,
    timers: &'a mut TimerSet<Deferred>,
    world: &'a mut dyn WorldHost,
    resources: &'a mut ResourceManagers,
    records: &'a mut PersistQueue,
    tick: u64,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        session: &'a Session,
        timers: &'a mut TimerSet<Deferred>,
        world: &'a mut dyn WorldHost,
        resources: &'a mut ResourceManagers,
        records: &'a mut PersistQueue,
        tick: u64,
    ) -> Self {
        Self {
            session,
            timers,
            world,
            resources,
            records,
            tick,
        }
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn participants(&self) -> &[ParticipantId] {
        self.session.participants()
    }

    pub fn config(&self) -> &SessionConfig {
        self.session.config()
    }

    /// Current external tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Read-only view of the world. Writes go through the methods below.
    pub fn world(&self) -> &dyn WorldHost {
        &*self.world
    }

    fn split(&mut self) -> (&mut ResourceManagers, ResourceCx<'_>) {
        (
            &mut *self.resources,
            ResourceCx {
                world: &mut *self.world,
                records: &mut *self.records,
                tick: self.tick,
            },
        )
    }

    pub fn spawn_actor(&mut self, spawn: ActorSpawn) -> Result<ActorHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.spawn_actor(&mut cx, session, spawn)
    }

    /// Snapshot and clear a participant's inventory.
    pub fn strip_inventory(&mut self, participant: ParticipantId) -> Result<InventoryHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.take_inventory(&mut cx, session, InventorySpec::strip(participant))
    }

    /// Snapshot a participant's inventory and hand out `kit` instead.
    pub fn give_kit(
        &mut self,
        participant: ParticipantId,
        kit: Inventory,
    ) -> Result<InventoryHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.take_inventory(&mut cx, session, InventorySpec::replace(participant, kit))
    }

    pub fn set_block(&mut self, pos: BlockPos, kind: BlockKind) -> Result<BlockHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.set_block(&mut cx, session, pos, kind)
    }

    /// Launch a projectile. With `flight_ticks` it lands and is removed
    /// automatically; otherwise it lives until released.
    pub fn launch_projectile(
        &mut self,
        launch: ProjectileLaunch,
        flight_ticks: Option<u64>,
    ) -> Result<ProjectileHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.launch_projectile(&mut cx, session, ProjectileSpec::new(launch, flight_ticks))
    }

    pub fn place_container(&mut self, spec: ContainerSpec) -> Result<ContainerHandle, ResourceError> {
        let session = self.session_id();
        let (resources, mut cx) = self.split();
        resources.place_container(&mut cx, session, spec)
    }

    /// Release one of this session's claims early.
    pub fn release(&mut self, claim: impl Into<ClaimRef>) -> ReleaseOutcome {
        let claim = claim.into();
        if claim.session != self.session_id() {
            return ReleaseOutcome::NotFound;
        }
        let (resources, mut cx) = self.split();
        resources.release(&mut cx, claim)
    }

    /// Run `callback` `delay` ticks from now (at least one). Pending callbacks
    /// are dropped unrun when the session ends.
    pub fn schedule<F>(&mut self, delay: u64, callback: F) -> TimerId
    where
        F: FnOnce(&mut EventContext<'_>) -> Result<(), HookError> + 'static,
    {
        let due = self.tick.saturating_add(delay.max(1));
        self.timers.schedule(due, Box::new(callback))
    }

    pub fn cancel(&mut self, timer: TimerId) -> bool {
        self.timers.cancel(timer).is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Claims this session currently holds.
    pub fn open_claims(&self) -> usize {
        self.resources.open_claims(self.session_id())
    }
}
