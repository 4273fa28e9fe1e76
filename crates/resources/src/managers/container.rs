use super::{ClaimRef, ResourceCx, ResourceManager};
use crate::error::ResourceError;
use crate::ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use eventspace_common::{BlockKind, BlockPos, ClaimId, ItemStack, SessionId};
use eventspace_persist::{ContainerKind, ContainerRecord, Record};

/// A temporary container to place for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub pos: BlockPos,
    pub block: BlockKind,
    pub kind: ContainerKind,
    pub contents: Vec<ItemStack>,
    /// Remove the container and its contents when the session ends.
    pub clear_at_end: bool,
}

impl ContainerSpec {
    /// A chest at `pos`, emptied and removed when the session ends.
    pub fn new(pos: BlockPos, kind: ContainerKind) -> Self {
        Self {
            pos,
            block: BlockKind::new("CHEST"),
            kind,
            contents: Vec::new(),
            clear_at_end: true,
        }
    }

    /// Items to put in the container.
    pub fn with_contents(mut self, contents: Vec<ItemStack>) -> Self {
        self.contents = contents;
        self
    }

    /// Leave the container in the world after the session ends.
    pub fn keep_after_end(mut self) -> Self {
        self.clear_at_end = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub session: SessionId,
    pub claim: ClaimId,
    pub pos: BlockPos,
    pub container_id: String,
}

impl From<&ContainerHandle> for ClaimRef {
    fn from(h: &ContainerHandle) -> Self {
        ClaimRef {
            session: h.session,
            kind: ResourceKind::TemporaryContainer,
            claim: h.claim,
        }
    }
}

/// Places temporary containers and tracks them in the persistence store.
#[derive(Debug, Default)]
pub struct ContainerManager;

impl ResourceManager for ContainerManager {
    const KIND: ResourceKind = ResourceKind::TemporaryContainer;
    type Spec = ContainerSpec;
    type Handle = ContainerHandle;

    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: ContainerSpec,
    ) -> Result<ContainerHandle, ResourceError> {
        let pos = spec.pos;
        let target = ClaimTarget::Block(pos);
        if let Some((owner, _, _)) = ledger.owner_of(&target) {
            return Err(ResourceError::AlreadyClaimed { target, owner });
        }

        let original = cx.world.block_at(pos);
        cx.world.set_block(pos, spec.block.clone());
        cx.world.set_container_contents(pos, spec.contents);

        // The coordinate is exclusively ours, so session + position is unique.
        let container_id = format!("{}-{}_{}_{}", session, pos.x, pos.y, pos.z);
        cx.records.put_record(&ContainerRecord {
            location: pos,
            kind: spec.kind,
            container_id: container_id.clone(),
            session_id: session,
            clear_at_end: spec.clear_at_end,
            last_modified: eventspace_common::now(),
        });

        let claim = ledger.record(
            session,
            Self::KIND,
            target,
            ClaimSnapshot::Container {
                original,
                placed: spec.block,
                kind: spec.kind,
                container_id: container_id.clone(),
                clear_at_end: spec.clear_at_end,
            },
        );
        Ok(ContainerHandle {
            session,
            claim,
            pos,
            container_id,
        })
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        let (
            ClaimTarget::Block(pos),
            ClaimSnapshot::Container {
                original,
                placed,
                container_id,
                clear_at_end,
                ..
            },
        ) = (&claim.target, &claim.snapshot)
        else {
            return Err(ResourceError::SnapshotMismatch {
                claim: claim.id,
                kind: Self::KIND,
            });
        };

        cx.records.remove(ContainerRecord::key_for(container_id));
        if !clear_at_end {
            tracing::info!(claim = %claim.id, %pos, "container kept after session end");
            return Ok(());
        }

        let found = cx.world.block_at(*pos);
        if &found != placed {
            return Err(ResourceError::Conflict {
                pos: *pos,
                expected: placed.clone(),
                found,
            });
        }
        cx.world.clear_container(*pos);
        cx.world.set_block(*pos, original.clone());
        Ok(())
    }
}
