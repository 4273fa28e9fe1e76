//! World Kernel: the host-side capabilities the event core builds on.
//!
//! # Invariants
//! - The core only touches the world through [`WorldHost`].
//! - Every mutation of [`World`] is recorded in its event log.

pub mod host;
pub mod world;

pub use host::{ProjectileLaunch, WorldHost};
pub use world::{ActorData, ParticipantData, ProjectileData, World, WorldEvent};
