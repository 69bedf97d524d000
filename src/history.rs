//! Bounded play history with a browse cursor for "previous" navigation.

use crate::model::TrackId;
use std::collections::VecDeque;

pub const HISTORY_CAP: usize = 20;

/// Recently departed tracks, oldest at the front.
///
/// `back` counts how many steps the user has browsed backwards: `0` means the
/// cursor is at the front (live playback), `k` means the `k`-th most recent
/// entry is loaded. Browsing never mutates the entries themselves.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<TrackId>,
    capacity: usize,
    back: usize,
    origin: Option<TrackId>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            back: 0,
            origin: None,
        }
    }

    /// Records a departed track, evicting the oldest entry when full. Resets
    /// the browse cursor.
    pub fn push(&mut self, id: TrackId) {
        self.reset_cursor();
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(id);
    }

    pub fn reset_cursor(&mut self) {
        self.back = 0;
        self.origin = None;
    }

    pub fn is_browsing(&self) -> bool {
        self.back > 0
    }

    pub fn can_step_back(&self) -> bool {
        self.back < self.entries.len()
    }

    /// Moves one entry further into the past. `live` is remembered as the
    /// track to return to when browsing starts from the front.
    pub fn step_back(&mut self, live: Option<TrackId>) -> Option<TrackId> {
        if !self.can_step_back() {
            return None;
        }
        if self.back == 0 {
            self.origin = live;
        }
        self.back += 1;
        self.entries.get(self.entries.len() - self.back).copied()
    }

    /// Moves one entry towards the present. Leaving the newest entry yields
    /// the track that was live when browsing began, if it still exists.
    pub fn step_forward(&mut self) -> Option<TrackId> {
        if self.back == 0 {
            return None;
        }
        self.back -= 1;
        if self.back == 0 {
            return self.origin.take();
        }
        self.entries.get(self.entries.len() - self.back).copied()
    }

    /// Drops entries rejected by `keep`, keeping the cursor on the same entry.
    /// If the browsed entry itself is dropped the cursor returns to the front.
    pub fn retain(&mut self, keep: impl Fn(TrackId) -> bool) {
        if self.origin.is_some_and(|id| !keep(id)) {
            self.origin = None;
        }

        let cursor = self.back.checked_sub(1).map(|steps| self.entries.len() - 1 - steps);
        let mut newer_removed = 0;
        let mut cursor_removed = false;
        let mut retained = VecDeque::with_capacity(self.capacity);

        for (position, id) in self.entries.iter().copied().enumerate() {
            if keep(id) {
                retained.push_back(id);
                continue;
            }
            match cursor {
                Some(at) if position == at => cursor_removed = true,
                Some(at) if position > at => newer_removed += 1,
                _ => {}
            }
        }

        self.entries = retained;
        if cursor_removed {
            self.reset_cursor();
        } else {
            self.back -= newer_removed;
            if self.back == 0 {
                self.origin = None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}
