use super::{ClaimRef, ResourceCx, ResourceManager};
use crate::error::ResourceError;
use crate::ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
use eventspace_common::{ClaimId, Inventory, ParticipantId, SessionId};

/// What to do with a participant's inventory after snapshotting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySpec {
    pub participant: ParticipantId,
    /// Kit handed out for the session; `None` leaves the inventory empty.
    pub replacement: Option<Inventory>,
}

impl InventorySpec {
    /// Snapshot and clear.
    pub fn strip(participant: ParticipantId) -> Self {
        Self {
            participant,
            replacement: None,
        }
    }

    /// Snapshot and hand out `kit` instead.
    pub fn replace(participant: ParticipantId, kit: Inventory) -> Self {
        Self {
            participant,
            replacement: Some(kit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryHandle {
    pub session: SessionId,
    pub claim: ClaimId,
    pub participant: ParticipantId,
}

impl From<InventoryHandle> for ClaimRef {
    fn from(h: InventoryHandle) -> Self {
        ClaimRef {
            session: h.session,
            kind: ResourceKind::InventorySnapshot,
            claim: h.claim,
        }
    }
}

/// Snapshots participant inventories and overwrites them back on release.
///
/// Restore is last-writer-wins: anything the participant picked up during
/// the session is discarded, never merged.
#[derive(Debug, Default)]
pub struct InventoryManager;

impl ResourceManager for InventoryManager {
    const KIND: ResourceKind = ResourceKind::InventorySnapshot;
    type Spec = InventorySpec;
    type Handle = InventoryHandle;

    fn acquire(
        &mut self,
        ledger: &mut ResourceLedger,
        cx: &mut ResourceCx<'_>,
        session: SessionId,
        spec: InventorySpec,
    ) -> Result<InventoryHandle, ResourceError> {
        let participant = spec.participant;
        let target = ClaimTarget::Participant(participant);
        let replacement = spec.replacement.unwrap_or_default();

        if let Some((owner, _, claim)) = ledger.owner_of(&target) {
            if owner != session {
                return Err(ResourceError::AlreadyClaimed { target, owner });
            }
            // Already snapshotted by this session; keep the original snapshot.
            cx.world.set_inventory(participant, replacement);
            return Ok(InventoryHandle {
                session,
                claim,
                participant,
            });
        }

        let original = cx
            .world
            .inventory(participant)
            .ok_or(ResourceError::UnknownParticipant(participant))?;
        cx.world.set_inventory(participant, replacement);
        let claim = ledger.record(
            session,
            Self::KIND,
            target,
            ClaimSnapshot::Inventory(original),
        );
        Ok(InventoryHandle {
            session,
            claim,
            participant,
        })
    }

    fn restore(&mut self, claim: &ResourceClaim, cx: &mut ResourceCx<'_>) -> Result<(), ResourceError> {
        let (ClaimTarget::Participant(participant), ClaimSnapshot::Inventory(original)) =
            (&claim.target, &claim.snapshot)
        else {
            return Err(ResourceError::SnapshotMismatch {
                claim: claim.id,
                kind: Self::KIND,
            });
        };
        if cx.world.set_inventory(*participant, original.clone()) {
            Ok(())
        } else {
            Err(ResourceError::TargetMissing(claim.target))
        }
    }
}
