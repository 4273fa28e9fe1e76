use super::{ClaimRef, ResourceCx, ResourceManager};
use crate::error::ResourceError;
use crate::ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use eventspace_common::{BlockKind, BlockPos, ClaimId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub session: SessionId,
    pub claim: ClaimId,
    pub pos: BlockPos,
}

impl From<BlockHandle> for ClaimRef {
    fn from(h: BlockHandle) -> Self {
        ClaimRef {
            session: h.session,
            kind: ResourceKind::BlockChange,
            claim: h.claim,
        }
    }
}

/// Records block changes and puts the original block back on release.
///
/// A coordinate belongs to one session at a time. Restore only happens when
/// the block still holds what this session last set there.
#[derive(Debug, Default)]
pub struct BlockManager;

impl ResourceManager for BlockManager {
    const KIND: ResourceKind = ResourceKind::BlockChange;
    type Spec = (BlockPos, BlockKind);
    type Handle = BlockHandle;

    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        (pos, kind): (BlockPos, BlockKind),
    ) -> Result<BlockHandle, ResourceError> {
        let target = ClaimTarget::Block(pos);
        match ledger.owner_of(&target) {
            Some((owner, ResourceKind::BlockChange, claim)) if owner == session => {
                if let Some(ResourceClaim {
                    snapshot: ClaimSnapshot::Block { last_set, .. },
                    ..
                }) = ledger.get_mut(session, Self::KIND, claim)
                {
                    *last_set = kind.clone();
                }
                cx.world.set_block(pos, kind);
                Ok(BlockHandle {
                    session,
                    claim,
                    pos,
                })
            }
            Some((owner, _, _)) => Err(ResourceError::AlreadyClaimed { target, owner }),
            None => {
                let original = cx.world.block_at(pos);
                cx.world.set_block(pos, kind.clone());
                let claim = ledger.record(
                    session,
                    Self::KIND,
                    target,
                    ClaimSnapshot::Block {
                        original,
                        last_set: kind,
                    },
                );
                Ok(BlockHandle {
                    session,
                    claim,
                    pos,
                })
            }
        }
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        let (ClaimTarget::Block(pos), ClaimSnapshot::Block { original, last_set }) =
            (&claim.target, &claim.snapshot)
        else {
            return Err(ResourceError::SnapshotMismatch {
                claim: claim.id,
                kind: Self::KIND,
            });
        };
        let found = cx.world.block_at(*pos);
        if &found != last_set {
            return Err(ResourceError::Conflict {
                pos: *pos,
                expected: last_set.clone(),
                found,
            });
        }
        cx.world.set_block(*pos, original.clone());
        Ok(())
    }
}
