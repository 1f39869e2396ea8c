//! Active track registry: the set of currently playing instances.
//!
//! The registry owns each instance's [`SoundHandle`]. Removing an instance
//! always stops its handle first, so no stopped handle ever stays registered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engines::SoundHandle;

/// One playing occurrence of a track, scoped by `(name, location_id)`.
pub struct ActiveTrack {
    pub id: String,
    pub name: String,
    /// `""` is the global scope.
    pub location_id: String,
    /// Stored per-track volume, 0.0–1.0. Kept even while muted.
    pub volume: f32,
    pub is_muted: bool,
    pub looping: bool,
    handle: Box<dyn SoundHandle>,
}

impl ActiveTrack {
    pub fn new(
        id: String,
        name: String,
        location_id: String,
        volume: f32,
        looping: bool,
        handle: Box<dyn SoundHandle>,
    ) -> Self {
        Self {
            id,
            name,
            location_id,
            volume,
            is_muted: false,
            looping,
            handle,
        }
    }

    pub fn handle_mut(&mut self) -> &mut dyn SoundHandle {
        self.handle.as_mut()
    }

    pub fn matches(&self, name: &str, location_id: &str) -> bool {
        self.name == name && self.location_id == location_id
    }

    pub fn view(&self) -> ActiveTrackView {
        ActiveTrackView {
            id: self.id.clone(),
            name: self.name.clone(),
            location_id: self.location_id.clone(),
            volume: self.volume,
            is_muted: self.is_muted,
            looping: self.looping,
        }
    }
}

impl fmt::Debug for ActiveTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTrack")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("location_id", &self.location_id)
            .field("volume", &self.volume)
            .field("is_muted", &self.is_muted)
            .field("looping", &self.looping)
            .finish_non_exhaustive()
    }
}

/// Read-only snapshot of an [`ActiveTrack`] for UI callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTrackView {
    pub id: String,
    pub name: String,
    pub location_id: String,
    pub volume: f32,
    pub is_muted: bool,
    pub looping: bool,
}

/// Authoritative set of active tracks plus the playing-state flag.
#[derive(Debug, Default)]
pub struct ActiveTrackRegistry {
    tracks: Vec<ActiveTrack>,
    playing: bool,
}

impl ActiveTrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match on both `name` and `location_id`.
    pub fn find(&self, name: &str, location_id: &str) -> Option<&ActiveTrack> {
        self.tracks.iter().find(|t| t.matches(name, location_id))
    }

    pub fn find_mut(&mut self, name: &str, location_id: &str) -> Option<&mut ActiveTrack> {
        self.tracks.iter_mut().find(|t| t.matches(name, location_id))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ActiveTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut ActiveTrack> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Appends an instance. The caller must have checked for a duplicate
    /// `(name, location_id)` already.
    pub fn insert(&mut self, track: ActiveTrack) {
        debug_assert!(
            self.find_by_id(&track.id).is_none(),
            "duplicate instance id {}",
            track.id
        );
        self.tracks.push(track);
        self.playing = true;
    }

    /// Stops and removes the instance with `id`.
    ///
    /// After removal the playing flag is true only if other tracks remain.
    pub fn remove(&mut self, id: &str) -> Option<ActiveTrack> {
        let index = self.tracks.iter().position(|t| t.id == id)?;
        let still_playing = self.tracks.len() > 1;
        let mut track = self.tracks.remove(index);
        track.handle.stop();
        self.playing = still_playing;
        Some(track)
    }

    /// Stops and removes every instance matching `predicate`.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<ActiveTrack>
    where
        F: FnMut(&ActiveTrack) -> bool,
    {
        let (mut removed, kept): (Vec<ActiveTrack>, Vec<ActiveTrack>) =
            self.tracks.drain(..).partition(|t| predicate(t));
        self.tracks = kept;
        for track in removed.iter_mut() {
            track.handle.stop();
        }
        if !removed.is_empty() {
            self.playing = !self.tracks.is_empty();
        }
        removed
    }

    /// Stops every handle and empties the registry. Returns how many were stopped.
    pub fn clear(&mut self) -> usize {
        let count = self.tracks.len();
        for mut track in self.tracks.drain(..) {
            track.handle.stop();
        }
        self.playing = false;
        count
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ActiveTrack> {
        self.tracks.iter_mut()
    }

    pub fn snapshot(&self) -> Vec<ActiveTrackView> {
        self.tracks.iter().map(ActiveTrack::view).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
