use crate::ledger::{ClaimTarget, ResourceKind};
use eventspace_common::{BlockKind, BlockPos, ClaimId, ParticipantId, SessionId};

/// Errors from acquiring or restoring a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("{target:?} is already claimed by session {owner}")]
    AlreadyClaimed { target: ClaimTarget, owner: SessionId },
    #[error("participant {0} is unknown to the host")]
    UnknownParticipant(ParticipantId),
    /// The block no longer holds what this session last put there.
    #[error("block at {pos} changed to {found} (expected {expected}), restore skipped")]
    Conflict {
        pos: BlockPos,
        expected: BlockKind,
        found: BlockKind,
    },
    #[error("restore target {0:?} is gone")]
    TargetMissing(ClaimTarget),
    #[error("claim {claim} does not hold a {kind:?} snapshot")]
    SnapshotMismatch { claim: ClaimId, kind: ResourceKind },
    #[error("{action} at {pos} is not allowed in this session")]
    NotPermitted { pos: BlockPos, action: &'static str },
}
