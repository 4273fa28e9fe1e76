use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wall-clock time used for claim creation and record modification stamps.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current UTC time.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Unique identifier for a running event session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a participant (a connected player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an actor (creature, item drop, marker) in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an in-flight projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub Uuid);

impl ProjectileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectileId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a resource claim. Allocated monotonically by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimId(pub u64);

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer block coordinate in the world grid.
///
/// Ordered (x, then y, then z) so it can key a BTreeMap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Block containing a world-space point.
    pub fn containing(point: Vec3) -> Self {
        let v = point.floor().as_ivec3();
        Self::from(v)
    }

    /// Neighbouring position offset by `delta`.
    pub fn offset(self, delta: IVec3) -> Self {
        Self::from(self.as_ivec3() + delta)
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Material type of a block. Absent blocks read as [`BlockKind::air`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKind(pub String);

impl BlockKind {
    pub const AIR: &'static str = "AIR";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn air() -> Self {
        Self::new(Self::AIR)
    }

    pub fn is_air(&self) -> bool {
        self.0 == Self::AIR
    }
}

impl Default for BlockKind {
    fn default() -> Self {
        Self::air()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stack of identical items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }
}

/// Full inventory state of a participant: carried items plus worn equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub items: Vec<ItemStack>,
    pub equipment: Vec<ItemStack>,
}

impl Inventory {
    pub fn new(items: Vec<ItemStack>) -> Self {
        Self {
            items,
            equipment: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.equipment.is_empty()
    }

    /// Append an item stack to the carried items.
    pub fn add(&mut self, stack: ItemStack) {
        self.items.push(stack);
    }
}

/// Request to spawn an actor: what it is and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSpawn {
    pub kind: String,
    pub position: Vec3,
}

impl ActorSpawn {
    pub fn new(kind: impl Into<String>, position: Vec3) -> Self {
        Self {
            kind: kind.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_uniqueness() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn block_pos_orders_by_x_then_y_then_z() {
        let mut positions = vec![
            BlockPos::new(1, 0, 0),
            BlockPos::new(0, 5, 0),
            BlockPos::new(0, 0, 9),
        ];
        positions.sort();
        assert_eq!(positions[0], BlockPos::new(0, 0, 9));
        assert_eq!(positions[2], BlockPos::new(1, 0, 0));
    }

    #[test]
    fn block_pos_containing_floors_negative_coordinates() {
        let pos = BlockPos::containing(Vec3::new(-0.5, 64.2, 3.99));
        assert_eq!(pos, BlockPos::new(-1, 64, 3));
    }

    #[test]
    fn default_block_is_air() {
        assert!(BlockKind::default().is_air());
        assert!(!BlockKind::new("STONE").is_air());
    }

    #[test]
    fn empty_inventory() {
        let mut inv = Inventory::default();
        assert!(inv.is_empty());
        inv.add(ItemStack::new("BREAD", 3));
        assert!(!inv.is_empty());
    }
}
