use std::collections::BTreeMap;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Cancellable timers keyed by the tick they fall due on.
///
/// Replaces "run later" callbacks: whoever owns the set owns every pending
/// payload, so dropping or [`cancel_all`](Self::cancel_all)-ing the set
/// invalidates all of them at once.
#[derive(Debug)]
pub struct TimerSet<T> {
    entries: BTreeMap<(u64, TimerId), T>,
    due_of: BTreeMap<TimerId, u64>,
    next_id: u64,
}

impl<T> Default for TimerSet<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_of: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerSet<T> {
    /// An empty timer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fall due on tick `due`.
    pub fn schedule(&mut self, due: u64, payload: T) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.entries.insert((due, id), payload);
        self.due_of.insert(id, due);
        id
    }

    /// Cancel a timer, returning its payload if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let due = self.due_of.remove(&id)?;
        self.entries.remove(&(due, id))
    }

    /// Whether `id` is scheduled and not yet drained or cancelled.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_of.contains_key(&id)
    }

    /// Remove and return every payload due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: u64) -> Vec<(TimerId, T)> {
        let due = match now.checked_add(1) {
            Some(next) => {
                let later = self.entries.split_off(&(next, TimerId(0)));
                std::mem::replace(&mut self.entries, later)
            }
            None => std::mem::take(&mut self.entries),
        };
        due.into_iter()
            .map(|((_, id), payload)| {
                self.due_of.remove(&id);
                (id, payload)
            })
            .collect()
    }

    /// Cancel everything. Returns how many timers were pending.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        self.due_of.clear();
        n
    }

    /// Timers still pending.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
