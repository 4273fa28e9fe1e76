use super::{ClaimRef, ResourceCx, ResourceManager};
use crate::error::ResourceError;
use crate::ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use eventspace_common::{ActorId, ActorSpawn, ClaimId, SessionId};

/// An actor spawned for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorHandle {
    pub session: SessionId,
    pub claim: ClaimId,
    pub actor: ActorId,
}

impl From<ActorHandle> for ClaimRef {
    fn from(h: ActorHandle) -> Self {
        ClaimRef {
            session: h.session,
            kind: ResourceKind::SpawnedActor,
            claim: h.claim,
        }
    }
}

/// Spawns actors and removes them again.
#[derive(Debug, Default)]
pub struct EntityManager;

impl ResourceManager for EntityManager {
    const KIND: ResourceKind = ResourceKind::SpawnedActor;
    type Spec = ActorSpawn;
    type Handle = ActorHandle;

    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spawn: ActorSpawn,
    ) -> Result<ActorHandle, ResourceError> {
        let actor = cx.world.spawn_actor(&spawn);
        let claim = ledger.record(
            session,
            Self::KIND,
            ClaimTarget::Actor(actor),
            ClaimSnapshot::Actor,
        );
        Ok(ActorHandle {
            session,
            claim,
            actor,
        })
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        let ClaimTarget::Actor(actor) = claim.target else {
            return Err(ResourceError::SnapshotMismatch {
                claim: claim.id,
                kind: Self::KIND,
            });
        };
        if !cx.world.remove_actor(actor) {
            tracing::debug!(claim = %claim.id, ?actor, "actor already gone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventspace_kernel::{World, WorldHost};
    use eventspace_persist::{MemoryStore, PersistQueue};
    use glam::Vec3;

    #[test]
    fn missing_actor_is_not_an_error() {
        let mut world = World::new();
        let mut records = PersistQueue::new(Box::new(MemoryStore::new()));
        let mut ledger = ResourceLedger::new();
        let mut manager = EntityManager;
        let session = SessionId::new();
        let mut cx = ResourceCx {
            world: &mut world,
            records: &mut records,
            tick: 0,
        };

        let handle = manager
            .acquire(
                &mut ledger,
                &mut cx,
                session,
                ActorSpawn::new("SKELETON", Vec3::ZERO),
            )
            .unwrap();
        // Killed by something else before the session ended.
        assert!(cx.world.remove_actor(handle.actor));

        let report = manager.release_all(&mut ledger, &mut cx, session);
        assert_eq!(report.restored, 1);
        assert!(report.skipped.is_empty());
        assert!(ledger.is_empty());
    }
}
