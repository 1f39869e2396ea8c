//! Application state shared with UI command handlers.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use soundstage_core::catalog::{NewTrack, TrackDefinition};
use soundstage_core::config::{AudioConfig, ConfigLoader};
use soundstage_core::engines::audio_output::is_audio_available;
use soundstage_core::engines::{KiraBackend, MemoryBackend, SoundBackend};
use soundstage_core::registry::ActiveTrackView;
use soundstage_core::resolver::{AssetResolver, ChainResolver, DirectoryResolver, ManifestResolver};
use soundstage_core::soundboard::{PlayRequest, Soundboard};
use tokio::runtime::Runtime;

/// Thread-safe log buffer for capturing tracing output (in-app debug view).
pub type LogBuffer = Arc<std::sync::Mutex<VecDeque<String>>>;

/// Active state snapshot for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveState {
    /// Catalog of known tracks.
    pub tracks: Vec<TrackDefinition>,
    pub active_tracks: Vec<ActiveTrackView>,
    pub master_volume: f32,
    pub is_playing: bool,
    /// Name of the sound backend in use (`"kira"` or `"memory"`).
    pub backend: String,
}

/// Synchronous wrapper over the soundboard for UI command handlers.
pub struct AppState {
    soundboard: Arc<Soundboard>,
    runtime: Runtime,
    log_buffer: LogBuffer,
}

impl AppState {
    /// Loads `config_path` (defaults if absent) and picks a backend.
    ///
    /// Uses kira when an output device exists, otherwise the memory backend.
    pub fn new(config_path: &Path, log_buffer: LogBuffer) -> anyhow::Result<Self> {
        let config = ConfigLoader::new(config_path)
            .load_or_default()
            .with_context(|| format!("loading {}", config_path.display()))?;

        let backend: Arc<dyn SoundBackend> = if is_audio_available() {
            Arc::new(KiraBackend::new())
        } else {
            tracing::warn!("No audio output device, using silent memory backend");
            Arc::new(MemoryBackend::new())
        };

        Self::with_backend(&config, backend, log_buffer)
    }

    /// Builds state around an explicit backend.
    pub fn with_backend(
        config: &AudioConfig,
        backend: Arc<dyn SoundBackend>,
        log_buffer: LogBuffer,
    ) -> anyhow::Result<Self> {
        let runtime = Runtime::new().context("creating tokio runtime")?;
        let resolver = build_resolver(config)?;
        let soundboard = Soundboard::from_config(config, resolver, backend);

        tracing::info!(
            backend = soundboard.engine().backend_name(),
            tracks = soundboard.tracks().len(),
            master_volume = soundboard.master_volume(),
            "Soundboard ready"
        );

        Ok(Self {
            soundboard: Arc::new(soundboard),
            runtime,
            log_buffer,
        })
    }

    pub fn soundboard(&self) -> &Soundboard {
        &self.soundboard
    }

    /// Starts playback in the background and returns immediately.
    pub fn play(&self, url: &str, request: PlayRequest) {
        let soundboard = Arc::clone(&self.soundboard);
        let url = url.to_string();
        self.runtime.spawn(async move {
            soundboard.play(&url, request).await;
        });
    }

    /// Plays and waits until the request has been settled.
    pub fn play_blocking(&self, url: &str, request: PlayRequest) {
        self.runtime.block_on(self.soundboard.play(url, request));
    }

    pub fn stop(&self, track_id: &str) {
        self.soundboard.stop(track_id);
    }

    pub fn stop_all(&self) {
        self.soundboard.stop_all();
    }

    pub fn set_master_volume(&self, level: f32) {
        self.soundboard.set_master_volume(level);
    }

    pub fn adjust_track_volume(&self, track_id: &str, level: f32) {
        self.soundboard.adjust_track_volume(track_id, level);
    }

    pub fn toggle_mute(&self, track_id: &str) {
        self.soundboard.toggle_mute(track_id);
    }

    pub fn add_track(&self, name: &str, url: &str) {
        self.soundboard.add_track(NewTrack::new(name, url));
    }

    pub fn get_active_state(&self) -> ActiveState {
        ActiveState {
            tracks: self.soundboard.tracks(),
            active_tracks: self.soundboard.active_tracks(),
            master_volume: self.soundboard.master_volume(),
            is_playing: self.soundboard.is_playing(),
            backend: self.soundboard.engine().backend_name().to_string(),
        }
    }

    /// Returns the most recent log entries (up to 500).
    pub fn get_debug_log(&self) -> Vec<String> {
        let buf = self.log_buffer.lock().unwrap_or_else(|e| e.into_inner());
        buf.iter().cloned().collect()
    }

    /// Clears all buffered log entries.
    pub fn clear_debug_log(&self) {
        let mut buf = self.log_buffer.lock().unwrap_or_else(|e| e.into_inner());
        buf.clear();
    }

    /// Stops every track before shutdown.
    pub fn cleanup(&self) {
        tracing::info!("Cleaning up...");
        self.soundboard.stop_all();
    }
}

/// Manifest first (when configured), then the asset roots.
fn build_resolver(config: &AudioConfig) -> anyhow::Result<Arc<dyn AssetResolver>> {
    let mut chain = ChainResolver::new();

    if let Some(manifest) = config.resolved_manifest() {
        if manifest.exists() {
            let resolver = ManifestResolver::from_manifest_file(config.base_dir(), &manifest)
                .with_context(|| format!("reading manifest {}", manifest.display()))?;
            tracing::info!("Loaded {} manifest entries", resolver.len());
            chain = chain.push(Arc::new(resolver));
        } else {
            tracing::warn!("Manifest {} not found, skipping", manifest.display());
        }
    }

    let roots = config.resolved_asset_roots();
    if !roots.is_empty() {
        chain = chain.push(Arc::new(DirectoryResolver::new(roots)));
    }

    Ok(Arc::new(chain))
}
