use eventspace_common::{BlockPos, ParticipantId, SessionId, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record shape stored under a string key.
///
/// Encoding is JSON; the key namespace is the record's [`Record::PREFIX`].
pub trait Record: Serialize + DeserializeOwned {
    const PREFIX: &'static str;

    /// Key suffix identifying this record inside its namespace.
    fn id(&self) -> String;

    fn key(&self) -> String {
        format!("{}/{}", Self::PREFIX, self.id())
    }

    fn key_for(id: impl std::fmt::Display) -> String {
        format!("{}/{}", Self::PREFIX, id)
    }

    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// How many events a participant has taken part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub events_participated: u64,
}

impl ParticipantRecord {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            events_participated: 0,
        }
    }
}

impl Record for ParticipantRecord {
    const PREFIX: &'static str = "participant";

    fn id(&self) -> String {
        self.id.to_string()
    }
}

/// Identity of the world the engine runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldRecord {
    pub world_name: String,
    pub world_id: Uuid,
    pub last_modified: Timestamp,
}

impl WorldRecord {
    /// A fresh record with a new world id.
    pub fn new(world_name: impl Into<String>) -> Self {
        Self {
            world_name: world_name.into(),
            world_id: Uuid::new_v4(),
            last_modified: eventspace_common::now(),
        }
    }
}

impl Record for WorldRecord {
    const PREFIX: &'static str = "world";

    fn id(&self) -> String {
        self.world_name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    Regular,
    InstantReward,
}

/// A temporary container placed by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub location: BlockPos,
    pub kind: ContainerKind,
    pub container_id: String,
    pub session_id: SessionId,
    pub clear_at_end: bool,
    pub last_modified: Timestamp,
}

impl Record for ContainerRecord {
    const PREFIX: &'static str = "container";

    fn id(&self) -> String {
        self.container_id.clone()
    }
}
