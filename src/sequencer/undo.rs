/// Undo history - bounded ring of column-length snapshots
///
/// Only the per-column lengths are recorded, never the event payloads:
/// stepping back changes which stored events are visible, it does not
/// delete anything. The cursor clamps at the top slot instead of wrapping,
/// so once the ring is full each new commit overwrites the newest snapshot.

pub struct UndoHistory {
    snapshots: Vec<Vec<usize>>,
    index: usize,
}

impl UndoHistory {
    pub fn new(steps: usize, depth: usize) -> Self {
        debug_assert!(depth > 0);
        Self {
            snapshots: vec![vec![0; steps]; depth],
            index: 0,
        }
    }

    /// Saved-snapshot cursor, shown on the front panel.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    /// Record the live lengths if they differ from the active snapshot.
    /// Called when the record switch goes off.
    pub fn commit(&mut self, live: &[usize]) {
        if self.snapshots[self.index] == live {
            return;
        }
        self.index = (self.index + 1).min(self.snapshots.len() - 1);
        self.snapshots[self.index].copy_from_slice(live);
        log::debug!("undo snapshot committed at slot {}", self.index);
    }

    /// Step back one snapshot and return the lengths to restore.
    ///
    /// A clean undo (live lengths match the active snapshot) walks further
    /// back; a dirty undo first reverts the in-progress change.
    pub fn step_back(&mut self, live: &[usize]) -> &[usize] {
        if self.index > 0 && self.snapshots[self.index] == live {
            self.index -= 1;
        }
        &self.snapshots[self.index]
    }

    /// Drop back to the empty initial snapshot.
    pub fn reset(&mut self) {
        self.index = 0;
        for slot in &mut self.snapshots[0] {
            *slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_skips_unchanged_lengths() {
        let mut undo = UndoHistory::new(4, 4);
        undo.commit(&[0, 0, 0, 0]);
        assert_eq!(undo.index(), 0);
        undo.commit(&[1, 0, 0, 0]);
        assert_eq!(undo.index(), 1);
        undo.commit(&[1, 0, 0, 0]);
        assert_eq!(undo.index(), 1);
    }

    #[test]
    fn round_trip_restores_committed_lengths() {
        let mut undo = UndoHistory::new(4, 4);
        let l1 = [2, 0, 1, 0];
        undo.commit(&l1);
        // Mutated since the commit: a dirty undo reverts to L1.
        let l2 = [2, 3, 1, 0];
        assert_eq!(undo.step_back(&l2), &l1);
        assert_eq!(undo.index(), 1);
        // A clean undo walks back to the empty snapshot.
        assert_eq!(undo.step_back(&l1), &[0, 0, 0, 0]);
        assert_eq!(undo.index(), 0);
    }

    #[test]
    fn cursor_clamps_at_top() {
        let mut undo = UndoHistory::new(2, 3);
        undo.commit(&[1, 0]);
        undo.commit(&[2, 0]);
        undo.commit(&[3, 0]);
        undo.commit(&[4, 0]);
        assert_eq!(undo.index(), 2);
        // The newest snapshot was overwritten in place.
        assert_eq!(undo.step_back(&[4, 0]), &[2, 0]);
    }

    #[test]
    fn bottom_undo_stays_put() {
        let mut undo = UndoHistory::new(2, 3);
        assert_eq!(undo.step_back(&[0, 0]), &[0, 0]);
        assert_eq!(undo.index(), 0);
    }
}
