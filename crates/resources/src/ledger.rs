use crate::timer::TimerId;
use eventspace_common::{
    ActorId, BlockKind, BlockPos, ClaimId, Inventory, ParticipantId, ProjectileId, SessionId,
    Timestamp,
};
use eventspace_persist::ContainerKind;
use std::collections::BTreeMap;

/// Kind of resource a claim holds.
///
/// Declaration order is release order: in-flight effects are stopped first,
/// then actors removed, then blocks restored, inventories last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Projectile,
    SpawnedActor,
    TemporaryContainer,
    BlockChange,
    InventorySnapshot,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Projectile,
        ResourceKind::SpawnedActor,
        ResourceKind::TemporaryContainer,
        ResourceKind::BlockChange,
        ResourceKind::InventorySnapshot,
    ];
}

/// What a claim points at in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimTarget {
    Actor(ActorId),
    Participant(ParticipantId),
    Block(BlockPos),
    Projectile(ProjectileId),
}

/// Original state captured at acquire time, enough to revert the claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSnapshot {
    /// Spawned by the session; reverting means removing it.
    Actor,
    Inventory(Inventory),
    Block {
        original: BlockKind,
        last_set: BlockKind,
    },
    Projectile { effect: Option<TimerId> },
    Container {
        original: BlockKind,
        placed: BlockKind,
        kind: ContainerKind,
        container_id: String,
        clear_at_end: bool,
    },
}

/// A record that a session took or altered an externally owned resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceClaim {
    pub id: ClaimId,
    pub session: SessionId,
    pub kind: ResourceKind,
    pub target: ClaimTarget,
    pub snapshot: ClaimSnapshot,
    pub created_at: Timestamp,
}

type ClaimKey = (SessionId, ResourceKind, ClaimId);

/// Every open claim of every session, keyed by (session, kind, claim).
///
/// The key order makes a session's claims one contiguous range, so full
/// cleanup is a single traversal.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    claims: BTreeMap<ClaimKey, ResourceClaim>,
    /// Which open claim currently owns each target.
    targets: BTreeMap<ClaimTarget, ClaimKey>,
    next_id: u64,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new claim and return its id.
    ///
    /// Callers check [`owner_of`](Self::owner_of) first; recording over an
    /// owned target replaces the target index entry.
    pub fn record(
        &mut self,
        session: SessionId,
        kind: ResourceKind,
        target: ClaimTarget,
        snapshot: ClaimSnapshot,
    ) -> ClaimId {
        self.next_id += 1;
        let id = ClaimId(self.next_id);
        let key = (session, kind, id);
        self.claims.insert(
            key,
            ResourceClaim {
                id,
                session,
                kind,
                target,
                snapshot,
                created_at: eventspace_common::now(),
            },
        );
        self.targets.insert(target, key);
        tracing::debug!(session = %session, claim = %id, ?kind, ?target, "claim recorded");
        id
    }

    /// The session and claim that currently own `target`.
    pub fn owner_of(&self, target: &ClaimTarget) -> Option<(SessionId, ResourceKind, ClaimId)> {
        self.targets.get(target).copied()
    }

    pub fn get(&self, session: SessionId, kind: ResourceKind, id: ClaimId) -> Option<&ResourceClaim> {
        self.claims.get(&(session, kind, id))
    }

    pub fn get_mut(
        &mut self,
        session: SessionId,
        kind: ResourceKind,
        id: ClaimId,
    ) -> Option<&mut ResourceClaim> {
        self.claims.get_mut(&(session, kind, id))
    }

    /// Remove a claim from the ledger, handing it to the caller to revert.
    pub fn take(&mut self, session: SessionId, kind: ResourceKind, id: ClaimId) -> Option<ResourceClaim> {
        let claim = self.claims.remove(&(session, kind, id))?;
        self.untrack(&claim);
        Some(claim)
    }

    /// Remove every claim a session holds, in release order.
    pub fn drain_session(&mut self, session: SessionId) -> Vec<ResourceClaim> {
        let keys: Vec<ClaimKey> = self.session_keys(session).collect();
        self.drain_keys(keys)
    }

    /// Remove every claim of one kind a session holds.
    pub fn drain_session_kind(&mut self, session: SessionId, kind: ResourceKind) -> Vec<ResourceClaim> {
        let keys: Vec<ClaimKey> = self
            .session_keys(session)
            .filter(|(_, k, _)| *k == kind)
            .collect();
        self.drain_keys(keys)
    }

    /// Number of open claims owned by `session`.
    pub fn open_claims(&self, session: SessionId) -> usize {
        self.session_keys(session).count()
    }

    /// Sessions that currently hold at least one claim.
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut out: Vec<SessionId> = self.claims.keys().map(|(s, _, _)| *s).collect();
        out.dedup();
        out
    }

    pub fn claims(&self) -> impl Iterator<Item = &ResourceClaim> {
        self.claims.values()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn session_keys(&self, session: SessionId) -> impl Iterator<Item = ClaimKey> + '_ {
        self.claims
            .range((session, ResourceKind::Projectile, ClaimId(0))..)
            .map(|(k, _)| *k)
            .take_while(move |(s, _, _)| *s == session)
    }

    fn drain_keys(&mut self, keys: Vec<ClaimKey>) -> Vec<ResourceClaim> {
        // Newest first within a kind.
        let mut drained = Vec::with_capacity(keys.len());
        for key in keys.into_iter().rev() {
            if let Some(claim) = self.claims.remove(&key) {
                self.untrack(&claim);
                drained.push(claim);
            }
        }
        drained.sort_by_key(|c| c.kind);
        drained
    }

    fn untrack(&mut self, claim: &ResourceClaim) {
        let key = (claim.session, claim.kind, claim.id);
        if self.targets.get(&claim.target) == Some(&key) {
            self.targets.remove(&claim.target);
        }
    }
}
