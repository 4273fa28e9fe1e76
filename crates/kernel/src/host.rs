use eventspace_common::{
    ActorId, ActorSpawn, BlockKind, BlockPos, Inventory, ItemStack, ParticipantId, ProjectileId,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Request to launch a projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileLaunch {
    pub kind: String,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub shooter: Option<ParticipantId>,
}

/// Participant snapshot provider: the primitives the resource managers use
/// to take and restore world state.
///
/// Implementations belong to the host environment. Calls are made only from
/// the driving tick thread.
pub trait WorldHost {
    /// Whether the participant is currently connected.
    fn is_online(&self, participant: ParticipantId) -> bool;

    /// Full inventory of a known participant.
    fn inventory(&self, participant: ParticipantId) -> Option<Inventory>;

    /// Overwrite a participant's inventory. Returns false for unknown participants.
    fn set_inventory(&mut self, participant: ParticipantId, inventory: Inventory) -> bool;

    fn spawn_actor(&mut self, spawn: &ActorSpawn) -> ActorId;

    /// Remove an actor. Returns false when it no longer exists.
    fn remove_actor(&mut self, id: ActorId) -> bool;

    fn actor_exists(&self, id: ActorId) -> bool;

    /// Block type at a coordinate; air when nothing is there.
    fn block_at(&self, pos: BlockPos) -> BlockKind;

    fn set_block(&mut self, pos: BlockPos, kind: BlockKind);

    fn launch_projectile(&mut self, launch: &ProjectileLaunch) -> ProjectileId;

    /// Remove a projectile. Returns false when it already landed or was removed.
    fn remove_projectile(&mut self, id: ProjectileId) -> bool;

    fn projectile_exists(&self, id: ProjectileId) -> bool;

    /// Contents of the container at `pos`, if a container is there.
    fn container_contents(&self, pos: BlockPos) -> Option<Vec<ItemStack>>;

    /// Create or overwrite the container inventory at `pos`.
    fn set_container_contents(&mut self, pos: BlockPos, contents: Vec<ItemStack>);

    /// Drop the container inventory at `pos`, returning what it held.
    fn clear_container(&mut self, pos: BlockPos) -> Option<Vec<ItemStack>>;
}
