/// Grid store - fixed-capacity, column-major event storage
///
/// Each column is one step of the loop and holds up to `capacity` events.
/// Visibility is tracked by a per-column length; the backing storage never
/// shrinks, so restoring an older (larger) length snapshot brings the stale
/// payload back into view. Removal is swap-with-last, so order within a
/// column is not preserved.

/// A stored MIDI note command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NoteOn,
    NoteOff,
}

/// One captured note event.
///
/// `enabled = false` marks an event that was quantized forward into the
/// next column: the scheduler skips it once (flipping the flag) so it fires
/// on its second visit, not its first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub command: Command,
    pub note: u8,
    pub velocity: u8,
    pub enabled: bool,
}

impl Event {
    pub fn new(command: Command, note: u8, velocity: u8) -> Self {
        Self {
            command,
            note,
            velocity,
            enabled: true,
        }
    }

    /// Raw 3-byte MIDI message for this event.
    pub fn to_bytes(self) -> [u8; 3] {
        let status = match self.command {
            Command::NoteOn => 0x90,
            Command::NoteOff => 0x80,
        };
        [status, self.note, self.velocity]
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    columns: Vec<Vec<Event>>,
    lengths: Vec<usize>,
    capacity: usize,
}

impl Grid {
    pub fn new(steps: usize, capacity: usize) -> Self {
        Self {
            columns: (0..steps).map(|_| Vec::with_capacity(capacity)).collect(),
            lengths: vec![0; steps],
            capacity,
        }
    }

    pub fn steps(&self) -> usize {
        self.columns.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of visible events in a column.
    pub fn len(&self, column: usize) -> usize {
        self.lengths[column]
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.iter().all(|&len| len == 0)
    }

    /// Append an event at the column's write position. Returns `false` when
    /// the column is full and the event was dropped.
    pub fn push(&mut self, column: usize, event: Event) -> bool {
        let len = self.lengths[column];
        if len == self.capacity {
            log::debug!("column {} full, dropping event", column);
            return false;
        }
        if len < self.columns[column].len() {
            // Overwrite a stale slot left behind by an earlier rollback.
            self.columns[column][len] = event;
        } else {
            self.columns[column].push(event);
        }
        self.lengths[column] = len + 1;
        true
    }

    pub fn event(&self, column: usize, index: usize) -> Event {
        debug_assert!(index < self.lengths[column]);
        self.columns[column][index]
    }

    pub fn event_mut(&mut self, column: usize, index: usize) -> &mut Event {
        debug_assert!(index < self.lengths[column]);
        &mut self.columns[column][index]
    }

    /// Remove by swapping the last visible event into `index`.
    pub fn swap_remove(&mut self, column: usize, index: usize) {
        let len = self.lengths[column];
        debug_assert!(index < len);
        self.columns[column][index] = self.columns[column][len - 1];
        self.lengths[column] = len - 1;
    }

    /// Hide all events. Payload stays in the backing storage so a later
    /// length restore can bring it back.
    pub fn clear(&mut self) {
        for len in &mut self.lengths {
            *len = 0;
        }
    }

    /// Snapshot of the per-column lengths, for the undo history.
    pub fn lengths(&self) -> Vec<usize> {
        self.lengths.clone()
    }

    /// Restore a length snapshot. Only visibility changes; event payloads
    /// are untouched.
    pub fn restore_lengths(&mut self, lengths: &[usize]) {
        debug_assert_eq!(lengths.len(), self.lengths.len());
        for (column, &len) in lengths.iter().enumerate() {
            debug_assert!(len <= self.columns[column].len());
            self.lengths[column] = len.min(self.columns[column].len());
        }
    }

    /// Compact a settled column: a column two steps behind the write head
    /// can no longer receive quantized writes, so same-note duplicates can
    /// be reconciled.
    ///
    /// For every NoteOn, any later same-note event in the column is removed;
    /// a NoteOff among them is relocated to the next column first (an on/off
    /// pair inside one step is audibly meaningless). When a NoteOff was
    /// relocated, the NoteOn itself is removed too.
    pub fn settle(&mut self, column: usize) {
        let next = (column + 1) % self.steps();
        let mut i = 0;
        while i < self.lengths[column] {
            let head = self.columns[column][i];
            if head.command != Command::NoteOn {
                i += 1;
                continue;
            }
            let mut moved_off = false;
            let mut j = i + 1;
            while j < self.lengths[column] {
                let other = self.columns[column][j];
                if other.note != head.note {
                    j += 1;
                    continue;
                }
                if other.command == Command::NoteOff {
                    self.push(next, other);
                    moved_off = true;
                }
                // Re-examine j: the swapped-in event may match as well.
                self.swap_remove(column, j);
            }
            if moved_off {
                // Same rule for i: the swapped-in event needs a fresh look.
                self.swap_remove(column, i);
            } else {
                i += 1;
            }
        }
    }

    /// Iterator over the visible events of a column.
    pub fn column(&self, column: usize) -> impl Iterator<Item = Event> + '_ {
        self.columns[column][..self.lengths[column]].iter().copied()
    }

    /// Iterator over all visible events in step order.
    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        (0..self.steps()).flat_map(move |c| self.column(c))
    }

    /// Shift every visible note by `delta` semitones. The caller is
    /// responsible for range-checking against the tracked note bounds.
    pub fn transpose(&mut self, delta: i8) {
        for column in 0..self.steps() {
            for index in 0..self.lengths[column] {
                let event = &mut self.columns[column][index];
                event.note = (event.note as i16 + delta as i16) as u8;
            }
        }
    }
}
