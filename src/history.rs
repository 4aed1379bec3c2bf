//! Linear undo/redo log over immutable snapshots.

use std::sync::Arc;

/// Snapshot history with a cursor. Index 0 is the initial state and is never dropped.
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: Vec<Arc<T>>,
    index: usize,
}

impl<T> History<T> {
    /// History holding only `initial`, cursor on it.
    pub fn new(initial: Arc<T>) -> Self {
        History {
            snapshots: vec![initial],
            index: 0,
        }
    }

    /// Drops everything after the cursor, appends `snapshot` and moves the cursor onto it.
    pub fn record(&mut self, snapshot: Arc<T>) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;
        log::debug!("history: recorded snapshot {}", self.index);
    }

    /// Steps back one snapshot. `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<Arc<T>> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        log::debug!("history: undo to {}", self.index);
        Some(Arc::clone(&self.snapshots[self.index]))
    }

    /// Steps forward one snapshot. `None` at the newest snapshot.
    pub fn redo(&mut self) -> Option<Arc<T>> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        log::debug!("history: redo to {}", self.index);
        Some(Arc::clone(&self.snapshots[self.index]))
    }

    /// True when the cursor is past the initial snapshot.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// True when snapshots follow the cursor.
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Position of the cursor; 0 is the initial snapshot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of snapshots, never zero.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> History<u32> {
        let mut h = History::new(Arc::new(0));
        for v in 1..=3 {
            h.record(Arc::new(v));
        }
        h
    }

    #[test]
    fn undo_and_redo_are_noops_at_the_ends() {
        let mut h = History::new(Arc::new(0u32));
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
        assert_eq!(h.index(), 0);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn cursor_moves_and_flags_follow() {
        let mut h = history();
        assert_eq!(h.index(), 3);
        assert!(h.can_undo() && !h.can_redo());

        assert_eq!(*h.undo().unwrap(), 2);
        assert_eq!(*h.undo().unwrap(), 1);
        assert!(h.can_undo() && h.can_redo());

        assert_eq!(*h.redo().unwrap(), 2);
        assert_eq!(h.index(), 2);
    }

    #[test]
    fn record_after_undo_discards_future() {
        let mut h = history();
        h.undo();
        h.undo();
        h.record(Arc::new(42));
        assert_eq!(h.len(), 3);
        assert_eq!(h.index(), 2);
        assert!(!h.can_redo());
        assert_eq!(*h.undo().unwrap(), 1);
        assert_eq!(*h.redo().unwrap(), 42);
    }

    #[test]
    fn initial_snapshot_survives_full_undo() {
        let mut h = history();
        while h.undo().is_some() {}
        assert_eq!(h.index(), 0);
        h.record(Arc::new(9));
        assert_eq!(h.len(), 2);
        assert_eq!(*h.undo().unwrap(), 0);
        assert_eq!(*h.redo().unwrap(), 9);
    }
}
