//! Public façade consumed by UI callers.
//!
//! [`Soundboard`] wraps the [`PlaybackEngine`] and the [`TrackCatalog`]. It
//! applies its own defaults (no replace, `"global"` scope), clamps volume
//! input before the engine clamps it again, and drops the display-only name
//! from play requests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::catalog::{NewTrack, TrackCatalog, TrackDefinition};
use crate::config::AudioConfig;
use crate::engines::SoundBackend;
use crate::playback::{clamp_level, PlayOptions, PlaybackEngine};
use crate::registry::ActiveTrackView;
use crate::resolver::AssetResolver;

/// Scope used by the façade when the caller names none.
///
/// This is a real location key, not the engine's unscoped `""` bucket, so
/// façade-default tracks are swept by a replace aimed at `"global"`.
pub const GLOBAL_LOCATION: &str = "global";

/// Façade-level play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayRequest {
    pub replace: bool,
    pub location_id: String,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Display name from the UI. Never reaches the engine.
    pub name: Option<String>,
}

impl Default for PlayRequest {
    fn default() -> Self {
        Self {
            replace: false,
            location_id: GLOBAL_LOCATION.to_string(),
            looping: false,
            name: None,
        }
    }
}

impl PlayRequest {
    pub fn at(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            ..Self::default()
        }
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn with_loop(mut self) -> Self {
        self.looping = true;
        self
    }
}

impl From<PlayRequest> for PlayOptions {
    fn from(request: PlayRequest) -> Self {
        let PlayRequest {
            replace,
            location_id,
            looping,
            name: _,
        } = request;
        PlayOptions {
            replace,
            location_id,
            looping,
        }
    }
}

/// Stable API over the playback engine and track catalog.
pub struct Soundboard {
    engine: PlaybackEngine,
    catalog: Mutex<TrackCatalog>,
}

impl Soundboard {
    pub fn new(engine: PlaybackEngine) -> Self {
        Self {
            engine,
            catalog: Mutex::new(TrackCatalog::new()),
        }
    }

    /// Builds an engine from config settings and preloads the config's tracks.
    pub fn from_config(
        config: &AudioConfig,
        resolver: Arc<dyn AssetResolver>,
        backend: Arc<dyn SoundBackend>,
    ) -> Self {
        let engine = PlaybackEngine::with_settings(resolver, backend, config.playback_settings());
        let soundboard = Self::new(engine);
        for entry in &config.tracks {
            soundboard.add_track(entry.clone().into());
        }
        soundboard
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Catalog snapshot.
    pub fn tracks(&self) -> Vec<TrackDefinition> {
        self.catalog
            .lock()
            .map(|catalog| catalog.snapshot())
            .unwrap_or_default()
    }

    /// Registry snapshot.
    pub fn active_tracks(&self) -> Vec<ActiveTrackView> {
        self.engine.active_tracks()
    }

    pub async fn play(&self, url: &str, request: PlayRequest) {
        if let Some(name) = request.name.as_deref() {
            tracing::debug!("play '{}' ({})", name, url);
        }
        let outcome = self.engine.play(url, request.into()).await;
        tracing::trace!(?outcome, "play {}", url);
    }

    pub fn stop(&self, track_id: &str) {
        self.engine.stop_track(track_id);
    }

    pub fn stop_all(&self) {
        self.engine.stop_all_tracks();
    }

    pub fn set_master_volume(&self, level: f32) {
        self.engine.set_master_volume(clamp_level(level));
    }

    pub fn adjust_track_volume(&self, track_id: &str, level: f32) {
        self.engine.adjust_track_volume(track_id, clamp_level(level));
    }

    pub fn toggle_mute(&self, track_id: &str) {
        self.engine.toggle_mute_track(track_id);
    }

    pub fn add_track(&self, track: NewTrack) {
        match self.catalog.lock() {
            Ok(mut catalog) => {
                catalog.add(track);
            }
            Err(_) => tracing::error!("add_track: catalog lock poisoned"),
        }
    }

    pub fn master_volume(&self) -> f32 {
        self.engine.master_volume()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }
}
