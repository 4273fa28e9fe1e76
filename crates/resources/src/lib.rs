//! Resources: every piece of world state a session takes or grants, tracked
//! as claims in one ledger and reverted when the session ends.
//!
//! # Invariants
//! - A claim belongs to exactly one session and is released exactly once.
//! - `release_all(session)` leaves zero claims for that session, whether
//!   each restore succeeded, conflicted, or found its target gone.
//! - A coordinate, participant, actor or projectile is claimed by at most
//!   one session at a time; a second claim is rejected.

mod error;
mod ledger;
pub mod managers;
mod timer;

pub use error::ResourceError;
pub use ledger::{ClaimSnapshot, ClaimTarget, ResourceClaim, ResourceKind, ResourceLedger};
pub use managers::{
    ActorHandle, BlockHandle, BlockManager, ClaimRef, ContainerHandle, ContainerManager,
    ContainerSpec, EntityManager, InventoryHandle, InventoryManager, InventorySpec,
    ProjectileHandle, ProjectileLanding, ProjectileManager, ProjectileSpec, ReleaseOutcome,
    ReleaseReport, ResourceCx, ResourceManager, ResourceManagers,
};
pub use timer::{TimerId, TimerSet};
