//! Played-set shuffle: no track repeats until every other track has had a turn.

use crate::model::{Track, TrackId};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

#[derive(Debug)]
pub struct ShufflePolicy {
    played: HashSet<TrackId>,
    rng: SmallRng,
}

impl ShufflePolicy {
    pub fn new() -> Self {
        Self::from_rng(SmallRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        Self {
            played: HashSet::new(),
            rng,
        }
    }

    /// Picks the next track. Never returns `current` unless it is the only
    /// track. Starts a new cycle once every other track has been played.
    pub fn pick(&mut self, tracks: &[Track], current: Option<TrackId>) -> Option<TrackId> {
        if tracks.is_empty() {
            return None;
        }
        if let Some(id) = current {
            self.played.insert(id);
        }

        let mut candidates = self.candidates(tracks, current, true);
        if candidates.is_empty() {
            self.played.clear();
            if let Some(id) = current {
                self.played.insert(id);
            }
            candidates = self.candidates(tracks, current, false);
        }

        candidates.shuffle(&mut self.rng);
        let Some(chosen) = candidates.first().copied() else {
            // Single-track library: the only choice is the current track.
            return current.or_else(|| tracks.first().map(|track| track.id));
        };

        self.played.insert(chosen);
        Some(chosen)
    }

    fn candidates(
        &self,
        tracks: &[Track],
        current: Option<TrackId>,
        skip_played: bool,
    ) -> Vec<TrackId> {
        tracks
            .iter()
            .map(|track| track.id)
            .filter(|id| Some(*id) != current)
            .filter(|id| !skip_played || !self.played.contains(id))
            .collect()
    }

    pub fn mark_played(&mut self, id: TrackId) {
        self.played.insert(id);
    }

    pub fn reset(&mut self) {
        self.played.clear();
    }

    pub fn retain(&mut self, keep: impl Fn(TrackId) -> bool) {
        self.played.retain(|id| keep(*id));
    }

    pub fn played_count(&self) -> usize {
        self.played.len()
    }
}

impl Default for ShufflePolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(count: u64) -> Vec<Track> {
        (0..count)
            .map(|n| Track {
                id: TrackId(n),
                name: format!("{n}.mp3"),
            })
            .collect()
    }

    #[test]
    fn visits_every_other_track_before_repeating() {
        let library = tracks(6);
        let mut policy = ShufflePolicy::with_seed(7);
        let mut current = TrackId(0);
        let mut seen = HashSet::new();

        for _ in 0..5 {
            current = policy.pick(&library, Some(current)).expect("pick");
            assert!(seen.insert(current), "repeated {current} inside one cycle");
        }
        assert!(!seen.contains(&TrackId(0)));
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn new_cycle_still_avoids_current() {
        let library = tracks(2);
        let mut policy = ShufflePolicy::with_seed(1);
        let mut current = TrackId(0);
        for _ in 0..10 {
            let next = policy.pick(&library, Some(current)).expect("pick");
            assert_ne!(next, current);
            current = next;
        }
    }

    #[test]
    fn single_track_returns_itself() {
        let library = tracks(1);
        let mut policy = ShufflePolicy::with_seed(3);
        assert_eq!(policy.pick(&library, Some(TrackId(0))), Some(TrackId(0)));
        assert_eq!(policy.pick(&library, None), Some(TrackId(0)));
    }

    #[test]
    fn empty_library_picks_nothing() {
        let mut policy = ShufflePolicy::with_seed(3);
        assert_eq!(policy.pick(&[], None), None);
    }

    #[test]
    fn reset_clears_cycle() {
        let library = tracks(3);
        let mut policy = ShufflePolicy::with_seed(5);
        policy.pick(&library, Some(TrackId(0)));
        assert_eq!(policy.played_count(), 2);
        policy.reset();
        assert_eq!(policy.played_count(), 0);
    }
}
