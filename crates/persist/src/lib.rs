//! Persistence: record shapes, key/value record stores, and the write queue
//! the event core talks to.
//!
//! # Invariants
//! - Records round-trip byte-for-byte through any [`RecordStore`].
//! - Store failures never abort the caller; they are logged and counted.
//! - The in-memory view (queued writes) is authoritative until flushed.

mod queue;
mod records;
mod store;

pub use queue::{FlushReport, PersistQueue};
pub use records::{ContainerKind, ContainerRecord, ParticipantRecord, Record, WorldRecord};
pub use store::{FileStore, MemoryStore, RecordStore, StoreError, StoreMeta};
