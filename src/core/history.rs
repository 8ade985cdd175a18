//! Linear undo/redo history over full snapshots.

/// Past snapshots, the present one, and the redo chain.
///
/// Snapshots are owned values, so later edits to a live copy never reach
/// back into the history. There is exactly one present and no branching:
/// pushing a new snapshot discards the redo chain.
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    past: Vec<T>,
    present: T,
    /// Redo chain; the last element is the next snapshot `redo` restores.
    future: Vec<T>,
}

impl<T: Clone> History<T> {
    pub fn new(initial: T) -> Self {
        Self {
            past: Vec::new(),
            present: initial,
            future: Vec::new(),
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Make `snapshot` the present, keeping the old one as undoable.
    pub fn push(&mut self, snapshot: T) {
        let previous = std::mem::replace(&mut self.present, snapshot);
        self.past.push(previous);
        if !self.future.is_empty() {
            tracing::trace!(discarded = self.future.len(), "new edit discards redo chain");
            self.future.clear();
        }
    }

    /// Step back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        true
    }

    /// Step forward one snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Replace everything with a single present snapshot.
    pub fn reset(&mut self, snapshot: T) {
        self.past.clear();
        self.future.clear();
        self.present = snapshot;
    }

    pub fn into_present(self) -> T {
        self.present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_has_nothing_to_undo_or_redo() {
        let mut h = History::new(vec![1]);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(h.present(), &vec![1]);
    }

    #[test]
    fn push_then_undo_restores_previous() {
        let mut h = History::new(1);
        h.push(2);
        h.push(3);
        assert_eq!(h.past_len(), 2);
        assert!(h.undo());
        assert_eq!(*h.present(), 2);
        assert!(h.can_redo());
        assert!(h.undo());
        assert_eq!(*h.present(), 1);
        assert!(!h.can_undo());
    }

    #[test]
    fn undo_then_redo_is_identity() {
        let mut h = History::new("a".to_string());
        for s in ["b", "c", "d"] {
            h.push(s.to_string());
        }
        for _ in 0..3 {
            let before = h.present().clone();
            assert!(h.undo());
            assert!(h.redo());
            assert_eq!(h.present(), &before);
            h.undo();
        }
        assert_eq!(h.present(), "a");
    }

    #[test]
    fn redo_replays_in_order() {
        let mut h = History::new(0);
        h.push(1);
        h.push(2);
        h.undo();
        h.undo();
        assert_eq!(h.future_len(), 2);
        assert!(h.redo());
        assert_eq!(*h.present(), 1);
        assert!(h.redo());
        assert_eq!(*h.present(), 2);
        assert!(!h.redo());
    }

    #[test]
    fn push_after_undo_discards_redo() {
        let mut h = History::new(0);
        h.push(1);
        h.push(2);
        h.undo();
        assert!(h.can_redo());
        h.push(5);
        assert!(!h.can_redo());
        assert_eq!(h.future_len(), 0);
        assert!(h.undo());
        assert_eq!(*h.present(), 1);
    }

    #[test]
    fn snapshots_are_values_not_aliases() {
        let mut live = vec!["first".to_string()];
        let mut h = History::new(live.clone());
        live.push("second".to_string());
        h.push(live.clone());
        live[0] = "mutated".to_string();
        h.undo();
        assert_eq!(h.present(), &vec!["first".to_string()]);
        h.redo();
        assert_eq!(h.present()[0], "first");
    }

    #[test]
    fn reset_clears_both_chains() {
        let mut h = History::new(0);
        h.push(1);
        h.push(2);
        h.undo();
        h.reset(9);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.into_present(), 9);
    }
}
