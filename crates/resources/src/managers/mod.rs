//! Resource managers: one per resource kind, all sharing the ledger.
//!
//! Each manager knows how to take one kind of resource and how to put it
//! back. [`ResourceManagers`] owns the ledger and every manager and is the
//! only thing the session layer talks to.

mod block;
mod container;
mod entity;
mod inventory;
mod projectile;

pub use block::{BlockHandle, BlockManager};
pub use container::{ContainerHandle, ContainerManager, ContainerSpec};
pub use entity::{ActorHandle, EntityManager};
pub use inventory::{InventoryHandle, InventoryManager, InventorySpec};
pub use projectile::{ProjectileHandle, ProjectileLanding, ProjectileManager, ProjectileSpec};

use crate::error::ResourceError;
use crate::ledger::{ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use eventspace_common::{ActorSpawn, BlockKind, BlockPos, ClaimId, ParticipantId, SessionId};
use eventspace_kernel::WorldHost;
use eventspace_persist::PersistQueue;

/// Host collaborators a manager needs while acquiring or restoring.
pub struct ResourceCx<'a> {
    pub world: &'a mut dyn WorldHost,
    pub records: &'a mut PersistQueue,
    /// Current external tick.
    pub tick: u64,
}

/// Fully qualified reference to one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRef {
    pub session: SessionId,
    pub kind: ResourceKind,
    pub claim: ClaimId,
}

/// Result of releasing a single claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Restored,
    /// The claim was dropped but its restore was skipped (conflict or missing target).
    Skipped(ResourceError),
    /// No such open claim; releasing twice lands here.
    NotFound,
}

/// What a bulk release did for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub session: SessionId,
    pub restored: usize,
    pub skipped: Vec<(ClaimId, ResourceError)>,
}

impl ReleaseReport {
    /// An empty report for `session`.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            restored: 0,
            skipped: Vec::new(),
        }
    }

    /// Total claims processed.
    pub fn released(&self) -> usize {
        self.restored + self.skipped.len()
    }

    /// Restores skipped because someone else changed the block.
    pub fn conflicts(&self) -> usize {
        self.skipped
            .iter()
            .filter(|(_, e)| matches!(e, ResourceError::Conflict { .. }))
            .count()
    }

    /// Fold `other` into this report.
    pub fn merge(&mut self, other: ReleaseReport) {
        self.restored += other.restored;
        self.skipped.extend(other.skipped);
    }

    fn record(&mut self, claim: &ResourceClaim, result: Result<(), ResourceError>) {
        match settle(claim, result) {
            ReleaseOutcome::Restored => self.restored += 1,
            ReleaseOutcome::Skipped(e) => self.skipped.push((claim.id, e)),
            ReleaseOutcome::NotFound => {}
        }
    }
}

/// Log a restore result and turn it into an outcome.
fn settle(claim: &ResourceClaim, result: Result<(), ResourceError>) -> ReleaseOutcome {
    match result {
        Ok(()) => {
            tracing::debug!(session = %claim.session, claim = %claim.id, kind = ?claim.kind, "claim restored");
            ReleaseOutcome::Restored
        }
        Err(e @ ResourceError::Conflict { .. }) => {
            tracing::warn!(session = %claim.session, claim = %claim.id, error = %e, "resource conflict");
            ReleaseOutcome::Skipped(e)
        }
        Err(e) => {
            tracing::warn!(session = %claim.session, claim = %claim.id, error = %e, "claim abandoned");
            ReleaseOutcome::Skipped(e)
        }
    }
}

/// One resource kind's acquire/restore policy on top of the shared ledger.
pub trait ResourceManager {
    const KIND: ResourceKind;
    type Spec;
    type Handle;

    /// Take or grant one unit of the resource and record the claim.
    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: Self::Spec,
    ) -> Result<Self::Handle, ResourceError>;

    /// Revert one claim that has already been taken out of the ledger.
    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError>;

    /// Revert one claim. Releasing a missing claim is a no-op.
    fn release(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        claim: ClaimId,
    ) -> ReleaseOutcome {
        match ledger.take(session, Self::KIND, claim) {
            Some(claim) => {
                let result = self.restore(&claim, cx);
                settle(&claim, result)
            }
            None => ReleaseOutcome::NotFound,
        }
    }

    /// Revert every claim of this kind owned by `session`.
    fn release_all(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
    ) -> ReleaseReport {
        let mut report = ReleaseReport::new(session);
        for claim in ledger.drain_session_kind(session, Self::KIND) {
            let result = self.restore(&claim, cx);
            report.record(&claim, result);
        }
        report
    }
}

/// The ledger plus every resource manager.
#[derive(Debug, Default)]
pub struct ResourceManagers {
    ledger: ResourceLedger,
    entities: EntityManager,
    inventories: InventoryManager,
    blocks: BlockManager,
    projectiles: ProjectileManager,
    containers: ContainerManager,
}

impl ResourceManagers {
    /// Managers over an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared claim ledger.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Claims `session` still holds.
    pub fn open_claims(&self, session: SessionId) -> usize {
        self.ledger.open_claims(session)
    }

    /// Sessions still holding claims.
    pub fn sessions_with_claims(&self) -> Vec<SessionId> {
        self.ledger.sessions()
    }

    /// Projectile landings still scheduled.
    pub fn pending_landings(&self) -> usize {
        self.projectiles.pending()
    }

    /// Spawn an actor owned by `session`.
    pub fn spawn_actor(
        &mut self,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spawn: ActorSpawn,
    ) -> Result<ActorHandle, ResourceError> {
        self.entities.acquire(&mut self.ledger, cx, session, spawn)
    }

    /// Strip `participant`'s inventory for `session`.
    pub fn take_inventory(
        &mut self,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: InventorySpec,
    ) -> Result<InventoryHandle, ResourceError> {
        self.inventories.acquire(&mut self.ledger, cx, session, spec)
    }

    /// Set a block for `session`, remembering the original.
    pub fn set_block(
        &mut self,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        pos: BlockPos,
        kind: BlockKind,
    ) -> Result<BlockHandle, ResourceError> {
        self.blocks.acquire(&mut self.ledger, cx, session, (pos, kind))
    }

    /// Launch a projectile owned by `session`.
    pub fn launch_projectile(
        &mut self,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: ProjectileSpec,
    ) -> Result<ProjectileHandle, ResourceError> {
        self.projectiles.acquire(&mut self.ledger, cx, session, spec)
    }

    /// Place a temporary container for `session`.
    pub fn place_container(
        &mut self,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: ContainerSpec,
    ) -> Result<ContainerHandle, ResourceError> {
        self.containers.acquire(&mut self.ledger, cx, session, spec)
    }

    /// Release one claim through the manager for its kind.
    pub fn release(&mut self, cx: &mut ResourceCx<'_>, claim: ClaimRef) -> ReleaseOutcome {
        let ClaimRef {
            session,
            kind,
            claim,
        } = claim;
        let ledger = &mut self.ledger;
        match kind {
            ResourceKind::SpawnedActor => self.entities.release(ledger, cx, session, claim),
            ResourceKind::InventorySnapshot => self.inventories.release(ledger, cx, session, claim),
            ResourceKind::BlockChange => self.blocks.release(ledger, cx, session, claim),
            ResourceKind::Projectile => self.projectiles.release(ledger, cx, session, claim),
            ResourceKind::TemporaryContainer => self.containers.release(ledger, cx, session, claim),
        }
    }

    /// Restore a participant's inventory if any session holds it.
    pub fn release_participant(
        &mut self,
        cx: &mut ResourceCx<'_>,
        participant: ParticipantId,
    ) -> Option<ReleaseOutcome> {
        let (session, kind, claim) = self
            .ledger
            .owner_of(&ClaimTarget::Participant(participant))?;
        Some(self.release(
            cx,
            ClaimRef {
                session,
                kind,
                claim,
            },
        ))
    }

    /// Revert every claim `session` holds, all kinds, in one pass over the ledger.
    pub fn release_all(&mut self, cx: &mut ResourceCx<'_>, session: SessionId) -> ReleaseReport {
        let mut report = ReleaseReport::new(session);
        for claim in self.ledger.drain_session(session) {
            let result = self.restore(&claim, cx);
            report.record(&claim, result);
        }
        report
    }

    /// Land every projectile whose flight ended by `cx.tick`.
    pub fn poll_projectiles(&mut self, cx: &mut ResourceCx<'_>) -> Vec<ProjectileLanding> {
        self.projectiles.poll(&mut self.ledger, cx)
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        match claim.kind {
            ResourceKind::SpawnedActor => self.entities.restore(claim, cx),
            ResourceKind::InventorySnapshot => self.inventories.restore(claim, cx),
            ResourceKind::BlockChange => self.blocks.restore(claim, cx),
            ResourceKind::Projectile => self.projectiles.restore(claim, cx),
            ResourceKind::TemporaryContainer => self.containers.restore(claim, cx),
        }
    }
}
