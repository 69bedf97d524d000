use crate::error::CoreError;
use crate::history::History;
use crate::library::{self, LibraryStore};
use crate::model::{MAX_VOLUME, PlayerPhase, Settings, Track, TrackId};
use crate::shuffle::ShufflePolicy;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info};

/// A track the caller should hand to the audio engine. The controller stays
/// in [`PlayerPhase::Loading`] until `playback_started` or `playback_failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub id: TrackId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    pub id: TrackId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseToggle {
    Paused,
    Resumed,
    Start(PlayRequest),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Departure {
    Record,
    Browse,
}

#[derive(Debug)]
pub struct PlaybackController {
    tracks: Vec<Track>,
    current: Option<TrackId>,
    phase: PlayerPhase,
    volume: u8,
    shuffling: bool,
    queue: VecDeque<TrackId>,
    history: History,
    shuffle: ShufflePolicy,
    pending_removals: HashSet<TrackId>,
    next_id: u64,
    pub dirty: bool,
    pub status: String,
}

impl PlaybackController {
    pub fn new(settings: Settings) -> Self {
        Self::with_shuffle(settings, ShufflePolicy::new())
    }

    pub fn with_shuffle_seed(settings: Settings, seed: u64) -> Self {
        Self::with_shuffle(settings, ShufflePolicy::with_seed(seed))
    }

    fn with_shuffle(settings: Settings, shuffle: ShufflePolicy) -> Self {
        let settings = settings.clamped();
        Self {
            tracks: Vec::new(),
            current: None,
            phase: PlayerPhase::Idle,
            volume: settings.volume,
            shuffling: settings.is_shuffling,
            queue: VecDeque::new(),
            history: History::default(),
            shuffle,
            pending_removals: HashSet::new(),
            next_id: 0,
            dirty: true,
            status: String::from("Ready"),
        }
    }

    /// Restores persisted settings without touching the status line. The
    /// shuffle cycle only restarts when the mode actually changes.
    pub fn apply_settings(&mut self, settings: Settings) {
        let settings = settings.clamped();
        self.volume = settings.volume;
        if settings.is_shuffling != self.shuffling {
            self.set_shuffle(settings.is_shuffling);
        }
        self.dirty = true;
    }

    /// Replaces the library with a fresh listing. Names already known keep
    /// their ids; anything referencing a vanished track is purged.
    pub fn replace_library(&mut self, names: Vec<String>) {
        let known: HashMap<String, TrackId> = self
            .tracks
            .drain(..)
            .map(|track| (track.name, track.id))
            .collect();

        let mut seen = HashSet::new();
        let mut tracks = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.clone()) {
                continue;
            }
            let id = match known.get(&name) {
                Some(id) => *id,
                None => self.allocate_id(),
            };
            tracks.push(Track { id, name });
        }

        self.tracks = tracks;
        self.reconcile();
        info!(tracks = self.tracks.len(), "library replaced");
        self.set_status(&format!("Library loaded: {} tracks", self.tracks.len()));
    }

    /// Adds a freshly downloaded file. Returns the id of the (possibly
    /// pre-existing) entry.
    pub fn append_downloaded(&mut self, path: &Path) -> Option<TrackId> {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            self.set_status("Download produced an unusable file name");
            return None;
        };
        if !library::is_audio(path) {
            self.set_status(&format!("Downloaded {name} is not a supported audio file"));
            return None;
        }
        if let Some(existing) = self.id_by_name(name) {
            self.set_status(&format!("{name} is already in the library"));
            return Some(existing);
        }

        let id = self.allocate_id();
        self.tracks.push(Track {
            id,
            name: name.to_string(),
        });
        info!(track = %name, "downloaded track appended");
        self.set_status(&format!("Added {name}"));
        Some(id)
    }

    pub fn select_track(&mut self, index: usize) -> Result<PlayRequest, CoreError> {
        let id = self.id_at(index)?;
        Ok(self.start(id, Departure::Record))
    }

    pub fn play_next(&mut self) -> Option<PlayRequest> {
        if self.tracks.is_empty() {
            self.set_status("Library is empty");
            return None;
        }

        if let Some(id) = self.pop_queued() {
            debug!(track = %id, "playing manually queued track");
            return Some(self.start(id, Departure::Record));
        }

        if self.history.is_browsing() {
            if let Some(id) = self.history.step_forward().filter(|id| self.contains(*id)) {
                return Some(self.start(id, Departure::Browse));
            }
        }

        let target = if self.shuffling {
            self.shuffle.pick(&self.tracks, self.current)
        } else {
            let next = self
                .current_index()
                .map_or(0, |index| (index + 1) % self.tracks.len());
            self.tracks.get(next).map(|track| track.id)
        };
        target.map(|id| self.start(id, Departure::Record))
    }

    /// Steps back through history. At the oldest retained entry this is a
    /// no-op and returns `None`.
    pub fn play_previous(&mut self) -> Option<PlayRequest> {
        if self.history.is_empty() {
            self.set_status("No history yet");
            return None;
        }
        let live = self.current;
        while let Some(id) = self.history.step_back(live) {
            if self.contains(id) {
                return Some(self.start(id, Departure::Browse));
            }
        }
        self.set_status("No earlier track in history");
        None
    }

    pub fn on_track_ended(&mut self) -> Option<PlayRequest> {
        self.phase = PlayerPhase::Ended;
        let next = self.play_next();
        if next.is_none() {
            self.phase = PlayerPhase::Idle;
        }
        next
    }

    pub fn enqueue_next(&mut self, index: usize) -> Result<(), CoreError> {
        let id = self.id_at(index)?;
        self.queue.push_back(id);
        let name = self.name_of(id).unwrap_or_default().to_string();
        self.set_status(&format!("Queued next: {name}"));
        Ok(())
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.set_shuffle(!self.shuffling);
        self.set_status(if self.shuffling {
            "Shuffle on"
        } else {
            "Shuffle off"
        });
        self.shuffling
    }

    fn set_shuffle(&mut self, shuffling: bool) {
        self.shuffling = shuffling;
        self.shuffle.reset();
        self.dirty = true;
    }

    pub fn toggle_pause(&mut self) -> PauseToggle {
        match self.phase {
            PlayerPhase::Playing => {
                self.phase = PlayerPhase::Paused;
                self.set_status("Paused");
                PauseToggle::Paused
            }
            PlayerPhase::Paused => {
                self.phase = PlayerPhase::Playing;
                self.set_status("Resumed");
                PauseToggle::Resumed
            }
            PlayerPhase::Loading => PauseToggle::Ignored,
            PlayerPhase::Idle | PlayerPhase::Ended => match self.current {
                Some(id) => PauseToggle::Start(self.start(id, Departure::Browse)),
                None => self
                    .play_next()
                    .map_or(PauseToggle::Ignored, PauseToggle::Start),
            },
        }
    }

    pub fn playback_started(&mut self) {
        if self.phase == PlayerPhase::Loading {
            self.phase = PlayerPhase::Playing;
            if let Some(name) = self.current_track().map(|track| track.name.clone()) {
                self.set_status(&format!("Playing {name}"));
            }
        }
    }

    pub fn playback_failed(&mut self, reason: &str) {
        self.phase = PlayerPhase::Idle;
        self.set_status(&format!("playback error: {reason}"));
    }

    pub fn stop(&mut self) {
        self.current = None;
        self.phase = PlayerPhase::Idle;
        self.history.reset_cursor();
        self.dirty = true;
    }

    pub fn set_volume(&mut self, volume: u8) -> u8 {
        self.volume = volume.min(MAX_VOLUME);
        self.set_status(&format!("Volume: {}%", self.volume));
        self.volume
    }

    pub fn adjust_volume(&mut self, delta: i16) -> u8 {
        let next = (i16::from(self.volume) + delta).clamp(0, i16::from(MAX_VOLUME));
        self.set_volume(next as u8)
    }

    /// Marks a track for deletion. The library is left untouched until the
    /// deletion is confirmed.
    pub fn request_removal(&mut self, index: usize) -> Result<PendingRemoval, CoreError> {
        let id = self.id_at(index)?;
        let name = self.name_of(id).unwrap_or_default().to_string();
        if !self.pending_removals.insert(id) {
            return Err(CoreError::RemovalPending(name));
        }
        self.set_status(&format!("Removing {name}..."));
        Ok(PendingRemoval { id, name })
    }

    /// Applies a confirmed deletion. Returns `false` when the track had
    /// already left the library (for example through a rescan).
    pub fn confirm_removal(&mut self, name: &str) -> bool {
        let Some(position) = self.tracks.iter().position(|track| track.name == name) else {
            return false;
        };
        let removed = self.tracks.remove(position);
        self.pending_removals.remove(&removed.id);
        self.reconcile();
        info!(track = %removed.name, "track removed");
        self.set_status(&format!("Removed {}", removed.name));
        true
    }

    pub fn reject_removal(&mut self, name: &str, reason: &str) {
        if let Some(id) = self.id_by_name(name) {
            self.pending_removals.remove(&id);
        }
        self.set_status(&format!("Failed to remove {name}: {reason}"));
    }

    /// Deletes the file behind `index` through `store` and drops it from the
    /// library. A failed deletion leaves the library unchanged.
    pub fn remove_track(
        &mut self,
        index: usize,
        store: &dyn LibraryStore,
    ) -> anyhow::Result<PendingRemoval> {
        let pending = self.request_removal(index)?;
        if let Err(err) = store.remove(&pending.name) {
            self.reject_removal(&pending.name, &format!("{err:#}"));
            return Err(err);
        }
        self.confirm_removal(&pending.name);
        Ok(pending)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_id(&self) -> Option<TrackId> {
        self.current
    }

    pub fn current_index(&self) -> Option<usize> {
        let id = self.current?;
        self.index_of(id)
    }

    pub fn current_track(&self) -> Option<&Track> {
        let id = self.current?;
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayerPhase::Playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_shuffling(&self) -> bool {
        self.shuffling
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn queued(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.queue.iter().copied()
    }

    pub fn queue_position(&self, id: TrackId) -> Option<usize> {
        self.queue.iter().position(|queued| *queued == id)
    }

    pub fn is_pending_removal(&self, id: TrackId) -> bool {
        self.pending_removals.contains(&id)
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    pub fn name_of(&self, id: TrackId) -> Option<&str> {
        self.tracks
            .iter()
            .find(|track| track.id == id)
            .map(|track| track.name.as_str())
    }

    pub fn id_by_name(&self, name: &str) -> Option<TrackId> {
        self.tracks
            .iter()
            .find(|track| track.name == name)
            .map(|track| track.id)
    }

    fn start(&mut self, id: TrackId, departure: Departure) -> PlayRequest {
        if departure == Departure::Record {
            match self.current {
                Some(previous) => self.history.push(previous),
                None => self.history.reset_cursor(),
            }
        }
        self.current = Some(id);
        self.phase = PlayerPhase::Loading;
        self.shuffle.mark_played(id);

        let name = self.name_of(id).unwrap_or_default().to_string();
        self.set_status(&format!("Loading {name}"));
        PlayRequest { id, name }
    }

    fn pop_queued(&mut self) -> Option<TrackId> {
        while let Some(id) = self.queue.pop_front() {
            if self.contains(id) {
                return Some(id);
            }
        }
        None
    }

    fn reconcile(&mut self) {
        let live: HashSet<TrackId> = self.tracks.iter().map(|track| track.id).collect();
        self.queue.retain(|id| live.contains(id));
        self.history.retain(|id| live.contains(&id));
        self.shuffle.retain(|id| live.contains(&id));
        self.pending_removals.retain(|id| live.contains(id));

        if self.current.is_some_and(|id| !live.contains(&id)) {
            info!("current track left the library, stopping playback");
            self.stop();
        }
        self.dirty = true;
    }

    fn contains(&self, id: TrackId) -> bool {
        self.tracks.iter().any(|track| track.id == id)
    }

    fn id_at(&self, index: usize) -> Result<TrackId, CoreError> {
        self.tracks
            .get(index)
            .map(|track| track.id)
            .ok_or(CoreError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            })
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
