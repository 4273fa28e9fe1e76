use crate::host::{ProjectileLaunch, WorldHost};
use eventspace_common::{
    ActorId, ActorSpawn, BlockKind, BlockPos, Inventory, ItemStack, ParticipantId, ProjectileId,
};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
///
/// Each event carries the previous value where one existed, so the log can
/// be audited after a session to see exactly what was changed and reverted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorldEvent {
    ParticipantJoined { id: ParticipantId },
    ParticipantLeft { id: ParticipantId },
    InventoryReplaced {
        id: ParticipantId,
        old: Inventory,
        new: Inventory,
    },
    ActorSpawned { id: ActorId, spawn: ActorSpawn },
    ActorRemoved { id: ActorId },
    BlockChanged {
        pos: BlockPos,
        old: BlockKind,
        new: BlockKind,
    },
    ProjectileLaunched { id: ProjectileId },
    ProjectileRemoved { id: ProjectileId },
    ContainerChanged { pos: BlockPos },
    /// Simulation advanced one tick.
    Stepped { tick: u64 },
}

/// Per-participant data held by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantData {
    pub name: String,
    pub inventory: Inventory,
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorData {
    pub kind: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileData {
    pub kind: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub shooter: Option<ParticipantId>,
}

/// In-memory host world.
///
/// Stands in for the live game server in tests and in the CLI. Uses BTreeMap
/// throughout so iteration and [`World::state_hash`] are deterministic.
/// Offline participants keep their stored inventory, the way a server keeps
/// player data on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    participants: BTreeMap<ParticipantId, ParticipantData>,
    actors: BTreeMap<ActorId, ActorData>,
    blocks: BTreeMap<BlockPos, BlockKind>,
    projectiles: BTreeMap<ProjectileId, ProjectileData>,
    containers: BTreeMap<BlockPos, Vec<ItemStack>>,
    tick: u64,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    pub fn participants(&self) -> &BTreeMap<ParticipantId, ParticipantData> {
        &self.participants
    }

    pub fn actors(&self) -> &BTreeMap<ActorId, ActorData> {
        &self.actors
    }

    /// Connect a new participant carrying `inventory`. Returns its id.
    pub fn join(&mut self, name: impl Into<String>, inventory: Inventory) -> ParticipantId {
        let id = ParticipantId::new();
        self.join_with_id(id, name, inventory);
        id
    }

    /// Connect a participant with a known id (reconnects keep their stored inventory).
    pub fn join_with_id(&mut self, id: ParticipantId, name: impl Into<String>, inventory: Inventory) {
        self.participants
            .entry(id)
            .and_modify(|p| p.online = true)
            .or_insert(ParticipantData {
                name: name.into(),
                inventory,
                online: true,
            });
        self.event_log.push(WorldEvent::ParticipantJoined { id });
        tracing::debug!(participant = %id, "participant joined");
    }

    /// Disconnect a participant. Returns false if it was not online.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        match self.participants.get_mut(&id) {
            Some(p) if p.online => {
                p.online = false;
                self.event_log.push(WorldEvent::ParticipantLeft { id });
                tracing::debug!(participant = %id, "participant left");
                true
            }
            _ => false,
        }
    }

    /// Give an item directly, bypassing any session bookkeeping.
    pub fn give(&mut self, id: ParticipantId, stack: ItemStack) -> bool {
        let Some(old) = self.inventory(id) else {
            return false;
        };
        let mut new = old.clone();
        new.add(stack);
        self.set_inventory(id, new)
    }

    pub fn projectile(&self, id: ProjectileId) -> Option<&ProjectileData> {
        self.projectiles.get(&id)
    }

    /// Advance the simulation by one tick, moving every projectile along its velocity.
    pub fn step(&mut self) {
        self.tick += 1;
        for p in self.projectiles.values_mut() {
            p.position += p.velocity;
        }
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }

    /// Deterministic hash of everything a session may touch.
    ///
    /// The tick and the event log are excluded, so a world that was changed
    /// and fully reverted hashes the same as before.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let mix_stacks = |h: &mut u64, stacks: &[ItemStack]| {
            for s in stacks {
                mix(h, s.item.as_bytes());
                mix(h, &s.count.to_le_bytes());
            }
        };
        for (id, p) in &self.participants {
            mix(&mut h, id.0.as_bytes());
            mix_stacks(&mut h, &p.inventory.items);
            mix(&mut h, b"|");
            mix_stacks(&mut h, &p.inventory.equipment);
        }
        for (id, a) in &self.actors {
            mix(&mut h, id.0.as_bytes());
            mix(&mut h, a.kind.as_bytes());
        }
        for (pos, kind) in &self.blocks {
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, &pos.z.to_le_bytes());
            mix(&mut h, kind.0.as_bytes());
        }
        for id in self.projectiles.keys() {
            mix(&mut h, id.0.as_bytes());
        }
        for (pos, contents) in &self.containers {
            mix(&mut h, &pos.x.to_le_bytes());
            mix(&mut h, &pos.y.to_le_bytes());
            mix(&mut h, &pos.z.to_le_bytes());
            mix_stacks(&mut h, contents);
        }
        h
    }
}

impl WorldHost for World {
    fn is_online(&self, participant: ParticipantId) -> bool {
        self.participants
            .get(&participant)
            .is_some_and(|p| p.online)
    }

    fn inventory(&self, participant: ParticipantId) -> Option<Inventory> {
        self.participants
            .get(&participant)
            .map(|p| p.inventory.clone())
    }

    fn set_inventory(&mut self, participant: ParticipantId, inventory: Inventory) -> bool {
        let Some(data) = self.participants.get_mut(&participant) else {
            return false;
        };
        let old = std::mem::replace(&mut data.inventory, inventory.clone());
        self.event_log.push(WorldEvent::InventoryReplaced {
            id: participant,
            old,
            new: inventory,
        });
        true
    }

    fn spawn_actor(&mut self, spawn: &ActorSpawn) -> ActorId {
        let id = ActorId::new();
        self.actors.insert(
            id,
            ActorData {
                kind: spawn.kind.clone(),
                position: spawn.position,
            },
        );
        self.event_log.push(WorldEvent::ActorSpawned {
            id,
            spawn: spawn.clone(),
        });
        id
    }

    fn remove_actor(&mut self, id: ActorId) -> bool {
        if self.actors.remove(&id).is_some() {
            self.event_log.push(WorldEvent::ActorRemoved { id });
            true
        } else {
            false
        }
    }

    fn actor_exists(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    fn block_at(&self, pos: BlockPos) -> BlockKind {
        self.blocks.get(&pos).cloned().unwrap_or_default()
    }

    fn set_block(&mut self, pos: BlockPos, kind: BlockKind) {
        let previous = if kind.is_air() {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, kind.clone())
        };
        let old = previous.unwrap_or_default();
        self.event_log.push(WorldEvent::BlockChanged {
            pos,
            old,
            new: kind,
        });
    }

    fn launch_projectile(&mut self, launch: &ProjectileLaunch) -> ProjectileId {
        let id = ProjectileId::new();
        self.projectiles.insert(
            id,
            ProjectileData {
                kind: launch.kind.clone(),
                position: launch.origin,
                velocity: launch.velocity,
                shooter: launch.shooter,
            },
        );
        self.event_log.push(WorldEvent::ProjectileLaunched { id });
        id
    }

    fn remove_projectile(&mut self, id: ProjectileId) -> bool {
        if self.projectiles.remove(&id).is_some() {
            self.event_log.push(WorldEvent::ProjectileRemoved { id });
            true
        } else {
            false
        }
    }

    fn projectile_exists(&self, id: ProjectileId) -> bool {
        self.projectiles.contains_key(&id)
    }

    fn container_contents(&self, pos: BlockPos) -> Option<Vec<ItemStack>> {
        self.containers.get(&pos).cloned()
    }

    fn set_container_contents(&mut self, pos: BlockPos, contents: Vec<ItemStack>) {
        self.containers.insert(pos, contents);
        self.event_log.push(WorldEvent::ContainerChanged { pos });
    }

    fn clear_container(&mut self, pos: BlockPos) -> Option<Vec<ItemStack>> {
        let removed = self.containers.remove(&pos);
        if removed.is_some() {
            self.event_log.push(WorldEvent::ContainerChanged { pos });
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone() -> BlockKind {
        BlockKind::new("STONE")
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.actor_count(), 0);
        assert!(w.participants().is_empty());
    }

    #[test]
    fn spawn_and_remove_actor() {
        let mut w = World::new();
        let id = w.spawn_actor(&ActorSpawn::new("ZOMBIE", Vec3::ZERO));
        assert!(w.actor_exists(id));
        assert!(w.remove_actor(id));
        assert!(!w.actor_exists(id));
        // Second removal reports the actor as already gone.
        assert!(!w.remove_actor(id));
    }

    #[test]
    fn unset_blocks_read_as_air() {
        let mut w = World::new();
        let pos = BlockPos::new(1, 2, 3);
        assert!(w.block_at(pos).is_air());
        w.set_block(pos, stone());
        assert_eq!(w.block_at(pos), stone());
        w.set_block(pos, BlockKind::air());
        assert!(w.block_at(pos).is_air());
    }

    #[test]
    fn leave_keeps_stored_inventory() {
        let mut w = World::new();
        let id = w.join("alex", Inventory::new(vec![ItemStack::new("APPLE", 2)]));
        assert!(w.is_online(id));
        assert!(w.leave(id));
        assert!(!w.is_online(id));
        assert!(!w.leave(id));
        assert_eq!(w.inventory(id).unwrap().items.len(), 1);
    }

    #[test]
    fn step_moves_projectiles() {
        let mut w = World::new();
        let id = w.launch_projectile(&ProjectileLaunch {
            kind: "ARROW".into(),
            origin: Vec3::ZERO,
            velocity: Vec3::new(1.0, 0.0, 0.0),
            shooter: None,
        });
        w.step();
        w.step();
        assert_eq!(w.tick(), 2);
        assert_eq!(w.projectile(id).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn events_are_recorded() {
        let mut w = World::new();
        let id = w.spawn_actor(&ActorSpawn::new("PIG", Vec3::ZERO));
        w.step();
        w.remove_actor(id);
        assert_eq!(w.events().len(), 3); // spawn + step + remove
        let drained = w.drain_events();
        assert_eq!(drained.len(), 3);
        assert!(w.events().is_empty());
    }

    #[test]
    fn block_change_logs_previous_kind() {
        let mut w = World::new();
        let pos = BlockPos::new(0, 0, 0);
        w.set_block(pos, stone());
        w.set_block(pos, BlockKind::new("GOLD"));
        match w.events().last() {
            Some(WorldEvent::BlockChanged { old, new, .. }) => {
                assert_eq!(old, &stone());
                assert_eq!(new.0, "GOLD");
            }
            other => panic!("expected BlockChanged, got {other:?}"),
        }
    }

    #[test]
    fn state_hash_ignores_tick_and_matches_after_revert() {
        let mut w = World::new();
        let p = w.join("sam", Inventory::new(vec![ItemStack::new("SWORD", 1)]));
        w.set_block(BlockPos::new(0, 64, 0), stone());
        let before = w.state_hash();

        let original = w.inventory(p).unwrap();
        w.set_inventory(p, Inventory::default());
        let actor = w.spawn_actor(&ActorSpawn::new("SLIME", Vec3::ONE));
        w.set_block(BlockPos::new(0, 64, 0), BlockKind::new("GOLD"));
        w.step();
        assert_ne!(w.state_hash(), before);

        w.set_inventory(p, original);
        w.remove_actor(actor);
        w.set_block(BlockPos::new(0, 64, 0), stone());
        assert_eq!(w.state_hash(), before);
    }

    #[test]
    fn container_contents_roundtrip() {
        let mut w = World::new();
        let pos = BlockPos::new(5, 5, 5);
        assert!(w.container_contents(pos).is_none());
        w.set_container_contents(pos, vec![ItemStack::new("DIAMOND", 1)]);
        assert_eq!(w.container_contents(pos).unwrap().len(), 1);
        assert_eq!(w.clear_container(pos).unwrap().len(), 1);
        assert!(w.clear_container(pos).is_none());
    }
}
