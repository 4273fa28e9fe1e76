//! Shared types for the eventspace engine.
//!
//! Every other crate speaks in these identifiers and value types. Nothing
//! here owns state or performs I/O.

mod types;

pub use types::{
    ActorId, ActorSpawn, BlockKind, BlockPos, ClaimId, Inventory, ItemStack, ParticipantId,
    ProjectileId, SessionId, Timestamp, now,
};
