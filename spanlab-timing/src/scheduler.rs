//! Single-threaded delayed-callback queue with group cancellation.
//!
//! Every entry belongs to the cancellation group that was active when it was
//! scheduled. Beginning a new group drops the previous group's entries before
//! anything else can be queued, so work from an earlier sequence can never be
//! delivered after a later one has started.

use crate::cancel::{CancellationToken, TokenSource};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A delivered entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub id: TimerId,
    pub generation: u64,
    pub due_ms: u64,
    pub event: E,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub scheduled: u64,
    pub fired: u64,
    pub cancelled: u64,
}

#[derive(Debug)]
struct Entry<E> {
    token: CancellationToken,
    event: E,
}

#[derive(Debug)]
pub struct Scheduler<E> {
    source: TokenSource,
    active: Option<CancellationToken>,
    queue: BTreeMap<(u64, TimerId), Entry<E>>,
    next_id: u64,
    stats: SchedulerStats,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            source: TokenSource::new(),
            active: None,
            queue: BTreeMap::new(),
            next_id: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Cancels the current group and opens a new one.
    pub fn begin_group(&mut self) -> CancellationToken {
        self.drop_queued();
        let token = self.source.issue();
        debug!(generation = token.generation(), "scheduler group started");
        self.active = Some(token.clone());
        token
    }

    /// Cancels the current group without opening another.
    pub fn cancel_group(&mut self) {
        self.drop_queued();
        self.source.cancel_all();
        self.active = None;
    }

    pub fn active_token(&self) -> Option<&CancellationToken> {
        self.active.as_ref()
    }

    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(CancellationToken::generation)
    }

    /// Queues `event` at `due_ms` in the group identified by `token`.
    ///
    /// Returns `None` when the token is no longer live; stale callers cannot
    /// smuggle work into a newer group.
    pub fn schedule_at(&mut self, token: &CancellationToken, due_ms: u64, event: E) -> Option<TimerId> {
        if token.is_cancelled() {
            debug!(generation = token.generation(), "refused schedule on cancelled group");
            return None;
        }
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert(
            (due_ms, id),
            Entry {
                token: token.clone(),
                event,
            },
        );
        self.stats.scheduled += 1;
        Some(id)
    }

    /// Removes a single pending entry. Returns whether it was still queued.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.queue.keys().find(|(_, k)| *k == id).copied();
        match key {
            Some(key) => {
                self.queue.remove(&key);
                self.stats.cancelled += 1;
                true
            }
            None => false,
        }
    }

    /// Pops the earliest entry due at or before `now_ms`.
    ///
    /// Entries are delivered one at a time so that a handler may cancel or
    /// replace the group before the next entry is considered.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired<E>> {
        loop {
            let (&(due_ms, id), _) = self.queue.first_key_value()?;
            if due_ms > now_ms {
                return None;
            }
            let entry = self.queue.remove(&(due_ms, id))?;
            if entry.token.is_cancelled() {
                self.stats.cancelled += 1;
                continue;
            }
            self.stats.fired += 1;
            return Some(Fired {
                id,
                generation: entry.token.generation(),
                due_ms,
                event: entry.event,
            });
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn drop_queued(&mut self) {
        let dropped = self.queue.len() as u64;
        if dropped > 0 {
            debug!(dropped, "cancelled pending timers");
        }
        self.stats.cancelled += dropped;
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_deadline_then_insertion_order() {
        let mut s = Scheduler::new();
        let token = s.begin_group();
        s.schedule_at(&token, 100, "b");
        s.schedule_at(&token, 50, "a");
        s.schedule_at(&token, 100, "c");

        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(100)).map(|f| f.event).collect();
        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let mut s = Scheduler::new();
        let token = s.begin_group();
        s.schedule_at(&token, 10, ());
        assert!(s.pop_due(9).is_none());
        assert_eq!(s.next_due(), Some(10));
        assert!(s.pop_due(10).is_some());
        assert!(s.is_idle());
    }

    #[test]
    fn new_group_drops_old_entries() {
        let mut s = Scheduler::new();
        let old = s.begin_group();
        s.schedule_at(&old, 10, "old");
        let new = s.begin_group();
        s.schedule_at(&new, 20, "new");

        assert!(s.schedule_at(&old, 5, "late").is_none());
        let fired = s.pop_due(100).unwrap();
        assert_eq!(fired.event, "new");
        assert_eq!(fired.generation, new.generation());
        assert!(s.pop_due(100).is_none());
        assert_eq!(s.stats().cancelled, 1);
    }

    #[test]
    fn cancel_single_entry() {
        let mut s = Scheduler::new();
        let token = s.begin_group();
        let id = s.schedule_at(&token, 10, 1).unwrap();
        s.schedule_at(&token, 20, 2);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert_eq!(s.pop_due(30).map(|f| f.event), Some(2));
    }

    #[test]
    fn cancel_group_leaves_no_active_token() {
        let mut s: Scheduler<()> = Scheduler::new();
        let token = s.begin_group();
        s.schedule_at(&token, 1, ());
        s.cancel_group();
        assert!(token.is_cancelled());
        assert!(s.active_token().is_none());
        assert!(s.pop_due(10).is_none());
    }
}
