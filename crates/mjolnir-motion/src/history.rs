//! Bounded, chronological record of motion states.
//!
//! [`StateHistory`] keeps the most recent states in insertion order. Each
//! entry's duration is how long that state was in effect: time passing
//! between two additions is credited to the newest entry, so a state only
//! gets its duration once the next one is recorded. Repeating the last state
//! keeps the record the same size, and appending to a full history evicts
//! the oldest entry. A [`BacktrackCursor`]
//! walks the record from newest to oldest so a trip can be replayed in
//! reverse.
//!
//! Entries are addressed by an absolute sequence number (`evicted + index`),
//! so a cursor stays valid while new states are appended behind it and
//! reports depletion once the entry it wants has been evicted.

use alloc::collections::VecDeque;

use crate::clock::{elapsed, Tick, TickSource};
use crate::state::State;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Reverse traversal position inside a [`StateHistory`].
///
/// Created by [`StateHistory::backtrack_cursor`] and advanced by
/// [`StateHistory::next_back`]. The cursor is only meaningful for the history
/// that created it and becomes stale after that history is truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktrackCursor {
    /// Entry most recently yielded, or the starting entry before the first step.
    current: Option<u64>,
    /// Entry the next step will yield. `None` once past the oldest entry.
    next: Option<u64>,
}

impl BacktrackCursor {
    /// Returns `true` once stepping has moved past the oldest entry.
    pub fn is_depleted(&self) -> bool {
        self.next.is_none()
    }
}

/// Bounded history of [`State`]s.
#[derive(Debug)]
pub struct StateHistory<T: TickSource> {
    entries: VecDeque<State>,
    capacity: usize,
    /// Entries dropped from the front since construction.
    evicted: u64,
    last_tick: Tick,
    ticks: T,
}

impl<T: TickSource> StateHistory<T> {
    /// Creates an empty history holding at most `capacity` states.
    ///
    /// The current tick becomes the timing baseline.
    pub fn new(capacity: usize, ticks: T) -> Self {
        let last_tick = ticks.now();
        StateHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
            last_tick,
            ticks,
        }
    }

    /// Records a state.
    ///
    /// The time since the previous call is first added to the newest entry,
    /// which was in effect until now. If that entry equals `state` (direction
    /// and speeds) nothing else happens. Otherwise the oldest entry is evicted
    /// when the history is full and `state` is appended with a zero duration.
    /// Time elapsed before the first entry is not attributed to anything.
    ///
    /// # Returns
    ///
    /// The number of states in the history. A zero-capacity history ignores
    /// the call and returns `0`.
    pub fn add_state(&mut self, mut state: State) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        let now = self.ticks.now();
        let delta = elapsed(self.last_tick, now);

        self.last_tick = now;

        if let Some(last) = self.entries.back_mut() {
            last.set_duration(last.duration().saturating_add(delta));
            if *last == state {
                return self.entries.len();
            }
        }

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
            tracing::trace!(evicted = self.evicted, "history full, dropped oldest state");
        }
        state.set_duration(0);
        self.entries.push_back(state);
        self.entries.len()
    }

    /// Moves the timing baseline to now.
    ///
    /// Time that passes while nothing is recorded would otherwise be credited
    /// to the newest entry by the next [`add_state`](Self::add_state).
    pub fn restart_clock(&mut self) {
        self.last_tick = self.ticks.now();
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of states kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, dropping the oldest entries if the history no longer fits.
    ///
    /// # Returns
    ///
    /// The number of states left in the history.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        while self.entries.len() > capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        if capacity > self.entries.capacity() {
            self.entries.reserve(capacity - self.entries.len());
        }
        self.capacity = capacity;
        self.entries.len()
    }

    /// Newest state, if any.
    pub fn last(&self) -> Option<&State> {
        self.entries.back()
    }

    /// Mutable access to the newest state.
    pub fn last_mut(&mut self) -> Option<&mut State> {
        self.entries.back_mut()
    }

    /// State at `index`, `0` being the oldest.
    pub fn get(&self, index: usize) -> Option<&State> {
        self.entries.get(index)
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &State> + '_ {
        self.entries.iter()
    }

    /// Drops every entry. Outstanding cursors become depleted.
    pub fn clear(&mut self) {
        self.evicted += self.entries.len() as u64;
        self.entries.clear();
    }

    /// Cursor positioned at the newest entry.
    pub fn backtrack_cursor(&self) -> BacktrackCursor {
        self.backtrack_cursor_from(self.entries.len())
    }

    /// Cursor positioned at index `len - 1`, as if only the first `len` entries existed.
    ///
    /// `len` is clamped to the current length; `0` yields a depleted cursor.
    pub fn backtrack_cursor_from(&self, len: usize) -> BacktrackCursor {
        let len = len.min(self.entries.len());
        if len == 0 {
            return BacktrackCursor {
                current: None,
                next: None,
            };
        }
        let start = self.evicted + (len as u64 - 1);
        BacktrackCursor {
            current: Some(start),
            next: Some(start),
        }
    }

    /// Yields the state under the cursor and steps it one entry older.
    ///
    /// # Returns
    ///
    /// `None` when the cursor is depleted: it already yielded the oldest
    /// entry, or the entry it points at has since been evicted. The cursor
    /// never wraps around to newer entries.
    pub fn next_back(&self, cursor: &mut BacktrackCursor) -> Option<State> {
        let seq = cursor.next?;
        let Some(state) = self.by_sequence(seq) else {
            cursor.next = None;
            return None;
        };
        cursor.current = Some(seq);
        cursor.next = seq.checked_sub(1).filter(|prev| *prev >= self.evicted);
        Some(state)
    }

    /// Discards every entry newer than the cursor's current position.
    ///
    /// Used when a live command interrupts a replay: a later backtrack then
    /// resumes from the interruption point instead of replaying states that
    /// were recorded after the cursor was created. A depleted cursor clears
    /// the history.
    ///
    /// # Returns
    ///
    /// The number of states left in the history.
    pub fn truncate_to_cursor(&mut self, cursor: &BacktrackCursor) -> usize {
        match cursor.current {
            Some(seq) if !cursor.is_depleted() && seq >= self.evicted => {
                let keep = (seq - self.evicted) as usize + 1;
                self.entries.truncate(keep);
            }
            _ => self.clear(),
        }
        self.entries.len()
    }

    fn by_sequence(&self, seq: u64) -> Option<State> {
        let index = seq.checked_sub(self.evicted)?;
        self.entries.get(index as usize).copied()
    }
}
