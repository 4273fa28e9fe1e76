use crate::records::Record;
use crate::store::RecordStore;
use std::collections::BTreeMap;

/// A write waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingWrite {
    Put(Vec<u8>),
    Remove,
}

/// Outcome of one [`PersistQueue::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub failed: usize,
}

/// Fire-and-forget front for a [`RecordStore`].
///
/// Writes are queued and applied on [`flush`](Self::flush); reads see queued
/// writes first. A failed write is logged and dropped: the in-memory state
/// stays authoritative and nothing is retried here.
pub struct PersistQueue {
    store: Box<dyn RecordStore>,
    /// Latest pending write per key. Later writes to a key replace earlier ones.
    pending: BTreeMap<String, PendingWrite>,
    failures: u64,
}

impl PersistQueue {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
            failures: 0,
        }
    }

    /// Number of writes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total writes or reads that failed since creation.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Queue a record write.
    pub fn put_record<R: Record>(&mut self, record: &R) {
        let key = record.key();
        match record.encode() {
            Ok(bytes) => {
                tracing::debug!(%key, "queued record write");
                self.pending.insert(key, PendingWrite::Put(bytes));
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!(%key, error = %e, "failed to encode record, write dropped");
            }
        }
    }

    /// Queue a record removal.
    pub fn remove(&mut self, key: impl Into<String>) {
        let key = key.into();
        tracing::debug!(%key, "queued record removal");
        self.pending.insert(key, PendingWrite::Remove);
    }

    /// Read a record, preferring a queued write over the backing store.
    ///
    /// Store and decode failures are logged and read as absent.
    pub fn get_record<R: Record>(&mut self, key: &str) -> Option<R> {
        let bytes = match self.pending.get(key) {
            Some(PendingWrite::Put(bytes)) => bytes.clone(),
            Some(PendingWrite::Remove) => return None,
            None => match self.store.get(key) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return None,
                Err(e) => {
                    self.failures += 1;
                    tracing::warn!(%key, error = %e, "record read failed");
                    return None;
                }
            },
        };
        match R::decode(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                self.failures += 1;
                tracing::warn!(%key, error = %e, "record decode failed");
                None
            }
        }
    }

    /// Apply every queued write to the store.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        for (key, write) in std::mem::take(&mut self.pending) {
            let result = match &write {
                PendingWrite::Put(bytes) => self.store.put(&key, bytes),
                PendingWrite::Remove => self.store.remove(&key),
            };
            match result {
                Ok(()) => report.written += 1,
                Err(e) => {
                    report.failed += 1;
                    self.failures += 1;
                    tracing::warn!(%key, error = %e, "persistence write failed, not retried");
                }
            }
        }
        if report.written + report.failed > 0 {
            tracing::debug!(
                written = report.written,
                failed = report.failed,
                "persistence flush"
            );
        }
        report
    }
}
