//! Playback engine: de-duplicated, location-scoped track playback.
//!
//! Every operation is a short synchronous step over the registry, except for
//! asset resolution and handle construction in [`PlaybackEngine::play`].
//! The registry lock is never held across either, so other operations can
//! run while a play is resolving or decoding. Afterwards the engine re-checks
//! the registry before inserting, and drops the new handle if a duplicate won
//! the race or if `stop_all_tracks` ran in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engines::{HandleOptions, SoundBackend, SoundHandle};
use crate::error::{Error, Result};
use crate::events::{DiscardReason, PlaybackEvent, PlaybackObserver, TracingObserver};
use crate::registry::{ActiveTrack, ActiveTrackRegistry, ActiveTrackView};
use crate::resolver::{AssetCategory, AssetResolver};

/// Engine-wide settings, usually taken from [`AudioConfig`](crate::config::AudioConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Initial master volume, 0.0–1.0.
    pub master_volume: f32,
    /// Ask the backend to stream instead of decoding up front.
    pub streaming: bool,
    /// Re-check for a duplicate `(track, location)` after resolution.
    pub dedupe_after_resolve: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            streaming: true,
            dedupe_after_resolve: true,
        }
    }
}

/// Engine-level play options.
///
/// Unlike the façade's [`PlayRequest`](crate::soundboard::PlayRequest), there
/// is no display name here, and `replace` defaults to true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOptions {
    pub replace: bool,
    /// `""` is the global scope, which a replace never sweeps.
    pub location_id: String,
    pub looping: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            replace: true,
            location_id: String::new(),
            looping: false,
        }
    }
}

/// What a call to [`PlaybackEngine::play`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new instance was registered and started.
    Started(String),
    /// An existing muted instance was unmuted.
    Unmuted(String),
    /// An existing audible instance was left alone.
    AlreadyPlaying(String),
    /// Resolution finished but the result was dropped (duplicate or superseded).
    Discarded,
    /// Nothing could be played.
    Aborted,
}

/// Clamps a volume level to [0, 1]. NaN becomes 0.
pub fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Strips a single leading `/`.
pub fn normalize_source(url: &str) -> &str {
    url.strip_prefix('/').unwrap_or(url)
}

/// Final path segment of a normalized source; the de-duplication name.
pub fn asset_name(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}

struct EngineState {
    registry: ActiveTrackRegistry,
    master_volume: f32,
}

/// Owns the active track registry and every handle in it.
pub struct PlaybackEngine {
    state: Mutex<EngineState>,
    resolver: Arc<dyn AssetResolver>,
    backend: Arc<dyn SoundBackend>,
    observer: Arc<dyn PlaybackObserver>,
    settings: PlaybackSettings,
    /// Incremented by `stop_all_tracks` to invalidate in-flight plays.
    generation: AtomicU64,
    next_instance: AtomicU64,
}

impl PlaybackEngine {
    /// Creates an engine with default settings and the tracing observer.
    pub fn new(resolver: Arc<dyn AssetResolver>, backend: Arc<dyn SoundBackend>) -> Self {
        Self::with_settings(resolver, backend, PlaybackSettings::default())
    }

    pub fn with_settings(
        resolver: Arc<dyn AssetResolver>,
        backend: Arc<dyn SoundBackend>,
        settings: PlaybackSettings,
    ) -> Self {
        let settings = PlaybackSettings {
            master_volume: clamp_level(settings.master_volume),
            ..settings
        };

        Self {
            state: Mutex::new(EngineState {
                registry: ActiveTrackRegistry::new(),
                master_volume: settings.master_volume,
            }),
            resolver,
            backend,
            observer: Arc::new(TracingObserver),
            settings,
            generation: AtomicU64::new(0),
            next_instance: AtomicU64::new(0),
        }
    }

    /// Replaces the event sink.
    pub fn with_observer(mut self, observer: Arc<dyn PlaybackObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineState>> {
        self.state.lock().map_err(|_| Error::RegistryLock)
    }

    fn emit(&self, event: PlaybackEvent) {
        self.observer.on_event(&event);
    }

    fn next_instance_id(&self) -> String {
        format!("trk-{}", self.next_instance.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Plays `url` in the scope given by `options`.
    ///
    /// Never fails: every problem is reported through the observer and
    /// surfaces here only as [`PlayOutcome::Aborted`].
    pub async fn play(&self, url: &str, options: PlayOptions) -> PlayOutcome {
        match self.try_play(url, &options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.emit(PlaybackEvent::Aborted {
                    track: asset_name(normalize_source(url)).to_string(),
                    location: options.location_id.clone(),
                    reason: e.to_string(),
                });
                PlayOutcome::Aborted
            }
        }
    }

    async fn try_play(&self, url: &str, options: &PlayOptions) -> Result<PlayOutcome> {
        let source = normalize_source(url);
        let name = asset_name(source);
        let location = options.location_id.as_str();

        let start_generation = {
            let mut state = self.lock()?;

            if let Some(existing) = state.registry.find_mut(name, location) {
                let id = existing.id.clone();
                if existing.is_muted {
                    existing.is_muted = false;
                    let volume = existing.volume;
                    let handle = existing.handle_mut();
                    handle.set_muted(false);
                    handle.set_volume(volume);
                    self.emit(PlaybackEvent::Unmuted {
                        id: id.clone(),
                        track: name.to_string(),
                        location: location.to_string(),
                    });
                    return Ok(PlayOutcome::Unmuted(id));
                }
                self.emit(PlaybackEvent::AlreadyPlaying {
                    id: id.clone(),
                    track: name.to_string(),
                    location: location.to_string(),
                });
                return Ok(PlayOutcome::AlreadyPlaying(id));
            }

            if options.replace && !location.is_empty() {
                let replaced = state.registry.remove_where(|t| t.location_id == location);
                for track in replaced {
                    self.emit(PlaybackEvent::Replaced {
                        id: track.id,
                        track: track.name,
                        location: track.location_id,
                    });
                }
            }

            self.generation.load(Ordering::SeqCst)
        };

        let resolved = match self.resolver.resolve(AssetCategory::Audio, name).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.emit(PlaybackEvent::ResolveFailed {
                    track: name.to_string(),
                    fallback: source.to_string(),
                    error: e.to_string(),
                });
                source.to_string()
            }
        };

        if resolved.trim().is_empty() {
            self.emit(PlaybackEvent::Aborted {
                track: name.to_string(),
                location: location.to_string(),
                reason: "resolved source is empty".to_string(),
            });
            return Ok(PlayOutcome::Aborted);
        }

        // Cheap re-check before paying for a decode.
        let master_volume = {
            let state = self.lock()?;
            let reason = self.discard_reason(&state.registry, name, location, start_generation);
            if let Some(reason) = reason {
                return Ok(self.discard(name, location, reason));
            }
            state.master_volume
        };

        // Decoding can take a while; the registry stays unlocked meanwhile.
        let handle_options = HandleOptions {
            looping: options.looping,
            volume: master_volume,
            streaming: self.settings.streaming,
        };
        let mut handle = self.create_handle(resolved.clone(), handle_options).await?;

        let mut state = self.lock()?;

        let reason = self.discard_reason(&state.registry, name, location, start_generation);
        if let Some(reason) = reason {
            handle.stop();
            return Ok(self.discard(name, location, reason));
        }

        let master_volume = state.master_volume;
        if master_volume != handle_options.volume {
            handle.set_volume(master_volume);
        }
        // The instance is registered only once its handle is running.
        if let Err(e) = handle.play() {
            handle.stop();
            return Err(e);
        }

        let id = self.next_instance_id();
        state.registry.insert(ActiveTrack::new(
            id.clone(),
            name.to_string(),
            location.to_string(),
            master_volume,
            options.looping,
            handle,
        ));

        self.emit(PlaybackEvent::Started {
            id: id.clone(),
            track: name.to_string(),
            location: location.to_string(),
            source: resolved,
            looping: options.looping,
        });
        Ok(PlayOutcome::Started(id))
    }

    /// Why a resolved play must not be registered, if it must not.
    fn discard_reason(
        &self,
        registry: &ActiveTrackRegistry,
        name: &str,
        location: &str,
        start_generation: u64,
    ) -> Option<DiscardReason> {
        if self.generation.load(Ordering::SeqCst) != start_generation {
            return Some(DiscardReason::Superseded);
        }
        if self.settings.dedupe_after_resolve {
            if let Some(existing) = registry.find(name, location) {
                return Some(DiscardReason::Duplicate {
                    existing_id: existing.id.clone(),
                });
            }
        }
        None
    }

    fn discard(&self, name: &str, location: &str, reason: DiscardReason) -> PlayOutcome {
        self.emit(PlaybackEvent::Discarded {
            track: name.to_string(),
            location: location.to_string(),
            reason,
        });
        PlayOutcome::Discarded
    }

    /// Builds a handle on the blocking pool.
    async fn create_handle(
        &self,
        source: String,
        options: HandleOptions,
    ) -> Result<Box<dyn SoundHandle>> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.create(&[source], options))
            .await
            .map_err(|e| Error::Other(format!("sound construction task failed: {}", e)))?
    }

    /// Stops and removes one track. Unknown ids are ignored.
    pub fn stop_track(&self, id: &str) {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("stop_track({}): {}", id, e);
                return;
            }
        };

        match state.registry.remove(id) {
            Some(track) => self.emit(PlaybackEvent::Stopped {
                id: track.id,
                track: track.name,
                location: track.location_id,
            }),
            None => tracing::debug!("stop_track: no active track {}", id),
        }
    }

    /// Stops every track and invalidates plays still resolving.
    /// Returns the number of tracks stopped.
    pub fn stop_all_tracks(&self) -> usize {
        let old_gen = self.generation.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("stop_all_tracks: generation {} -> {}", old_gen, old_gen + 1);

        let count = match self.lock() {
            Ok(mut state) => state.registry.clear(),
            Err(e) => {
                tracing::error!("stop_all_tracks: {}", e);
                return 0;
            }
        };

        self.emit(PlaybackEvent::StoppedAll { count });
        count
    }

    /// Sets the master volume and applies it to every unmuted track.
    pub fn set_master_volume(&self, level: f32) {
        let level = clamp_level(level);
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("set_master_volume: {}", e);
                return;
            }
        };

        state.master_volume = level;
        for track in state.registry.iter_mut().filter(|t| !t.is_muted) {
            track.handle_mut().set_volume(level);
            track.volume = level;
        }

        self.emit(PlaybackEvent::MasterVolumeChanged { level });
    }

    /// Stores a per-track volume. It reaches the handle only if the track is
    /// unmuted; a muted track picks it up when unmuted.
    pub fn adjust_track_volume(&self, id: &str, level: f32) {
        let level = clamp_level(level);
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("adjust_track_volume({}): {}", id, e);
                return;
            }
        };

        let Some(track) = state.registry.find_by_id_mut(id) else {
            tracing::debug!("adjust_track_volume: no active track {}", id);
            return;
        };

        let applied = !track.is_muted;
        if applied {
            track.handle_mut().set_volume(level);
        }
        track.volume = level;

        self.emit(PlaybackEvent::TrackVolumeChanged {
            id: id.to_string(),
            level,
            applied,
        });
    }

    /// Flips mute on one track. Returns the new mute state, or `None` for an
    /// unknown id.
    pub fn toggle_mute_track(&self, id: &str) -> Option<bool> {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("toggle_mute_track({}): {}", id, e);
                return None;
            }
        };

        let Some(track) = state.registry.find_by_id_mut(id) else {
            tracing::debug!("toggle_mute_track: no active track {}", id);
            return None;
        };

        let muted = !track.is_muted;
        let volume = track.volume;
        let handle = track.handle_mut();
        handle.set_muted(muted);
        if !muted {
            handle.set_volume(volume);
        }
        track.is_muted = muted;

        self.emit(PlaybackEvent::MuteToggled {
            id: id.to_string(),
            muted,
        });
        Some(muted)
    }

    /// Read-only view of the registry.
    pub fn active_tracks(&self) -> Vec<ActiveTrackView> {
        self.lock()
            .map(|state| state.registry.snapshot())
            .unwrap_or_default()
    }

    pub fn active_count(&self) -> usize {
        self.lock().map(|state| state.registry.len()).unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.lock()
            .map(|state| state.registry.is_playing())
            .unwrap_or(false)
    }

    pub fn master_volume(&self) -> f32 {
        self.lock().map(|state| state.master_volume).unwrap_or(0.0)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.registry.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::MemoryBackend;
    use crate::resolver::ManifestResolver;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};
    use tokio::sync::Notify;

    /// Observer that keeps every event for later assertions.
    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<PlaybackEvent>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<PlaybackEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl PlaybackObserver for RecordingObserver {
        fn on_event(&self, event: &PlaybackEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// Resolver that holds every request until released.
    struct GatedResolver {
        gate: Notify,
    }

    #[async_trait]
    impl AssetResolver for GatedResolver {
        async fn resolve(&self, _category: AssetCategory, name: &str) -> Result<String> {
            self.gate.notified().await;
            Ok(format!("assets/{}", name))
        }
    }

    fn engine_with(
        resolver: ManifestResolver,
    ) -> (PlaybackEngine, Arc<MemoryBackend>, Arc<RecordingObserver>) {
        let backend = Arc::new(MemoryBackend::new());
        let observer = Arc::new(RecordingObserver::default());
        let engine = PlaybackEngine::new(Arc::new(resolver), backend.clone())
            .with_observer(observer.clone());
        (engine, backend, observer)
    }

    /// Backend whose handle construction takes as long as a large decode.
    struct SlowBackend {
        inner: MemoryBackend,
        delay: Duration,
    }

    impl SoundBackend for SlowBackend {
        fn create(
            &self,
            sources: &[String],
            options: HandleOptions,
        ) -> Result<Box<dyn SoundHandle>> {
            std::thread::sleep(self.delay);
            self.inner.create(sources, options)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn engine() -> (PlaybackEngine, Arc<MemoryBackend>, Arc<RecordingObserver>) {
        engine_with(ManifestResolver::new())
    }

    fn at(location: &str) -> PlayOptions {
        PlayOptions {
            location_id: location.to_string(),
            ..PlayOptions::default()
        }
    }

    fn started_id(outcome: PlayOutcome) -> String {
        match outcome {
            PlayOutcome::Started(id) => id,
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_source("/audio/name.mp3"), "audio/name.mp3");
        assert_eq!(normalize_source("//double.mp3"), "/double.mp3");
        assert_eq!(asset_name("audio/name.mp3"), "name.mp3");
        assert_eq!(asset_name("bare.mp3"), "bare.mp3");
        assert_eq!(asset_name(""), "");
    }

    #[test]
    fn test_clamp_level() {
        assert_eq!(clamp_level(1.5), 1.0);
        assert_eq!(clamp_level(-0.5), 0.0);
        assert_eq!(clamp_level(0.25), 0.25);
        assert_eq!(clamp_level(f32::NAN), 0.0);
    }

    #[test]
    fn test_play_options_default() {
        let options = PlayOptions::default();
        assert!(options.replace);
        assert_eq!(options.location_id, "");
        assert!(!options.looping);
    }

    #[tokio::test]
    async fn test_play_uses_resolved_source() {
        let (engine, backend, _) =
            engine_with(ManifestResolver::new().with_entry("amb.mp3", "/srv/amb.mp3"));

        started_id(engine.play("/audio/amb.mp3", at("forest")).await);

        let tracks = engine.active_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "amb.mp3");
        assert_eq!(tracks[0].location_id, "forest");
        assert_eq!(backend.handles()[0].source, "/srv/amb.mp3");
        assert!(backend.handles()[0].playing);
        assert!(engine.is_playing());
    }

    #[tokio::test]
    async fn test_sequential_plays_never_duplicate() {
        let (engine, backend, _) = engine();

        let id = started_id(engine.play("rain.ogg", at("cave")).await);
        for _ in 0..3 {
            assert_eq!(
                engine.play("sounds/rain.ogg", at("cave")).await,
                PlayOutcome::AlreadyPlaying(id.clone())
            );
        }

        assert_eq!(engine.active_count(), 1);
        assert_eq!(backend.created_count(), 1);
    }

    #[tokio::test]
    async fn test_same_name_in_different_scopes_coexist() {
        let (engine, _, _) = engine();

        engine.play("rain.ogg", at("cave")).await;
        engine.play("rain.ogg", at("")).await;

        assert_eq!(engine.active_count(), 2);
    }

    #[tokio::test]
    async fn test_replace_sweeps_scope_but_not_global() {
        let (engine, backend, _) = engine();

        engine.play("b.mp3", at("tavern")).await;
        engine.play("c.mp3", at("")).await;
        engine.play("d.mp3", at("market")).await;
        engine.play("a.mp3", at("tavern")).await;

        let names: Vec<String> = engine.active_tracks().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["c.mp3", "d.mp3", "a.mp3"]);
        assert!(backend.handles_for("b.mp3")[0].stopped);
        assert!(!backend.handles_for("c.mp3")[0].stopped);
    }

    #[tokio::test]
    async fn test_global_replace_does_not_sweep_globals() {
        let (engine, _, _) = engine();

        engine.play("a.mp3", at("")).await;
        engine.play("b.mp3", at("")).await;

        assert_eq!(engine.active_count(), 2);
    }

    #[tokio::test]
    async fn test_no_replace_keeps_scope() {
        let (engine, _, _) = engine();
        let keep = PlayOptions { replace: false, ..at("tavern") };

        engine.play("a.mp3", keep.clone()).await;
        engine.play("b.mp3", keep).await;

        assert_eq!(engine.active_count(), 2);
    }

    #[tokio::test]
    async fn test_retrigger_muted_unmutes_in_place() {
        let (engine, backend, _) = engine();

        let id = started_id(engine.play("amb.mp3", at("forest")).await);
        engine.adjust_track_volume(&id, 0.3);
        assert_eq!(engine.toggle_mute_track(&id), Some(true));
        assert!(backend.handles()[0].muted);

        let outcome = engine.play("amb.mp3", at("forest")).await;

        assert_eq!(outcome, PlayOutcome::Unmuted(id));
        assert_eq!(engine.active_count(), 1);
        assert_eq!(backend.created_count(), 1);
        let handle = backend.handles()[0].clone();
        assert!(!handle.muted);
        assert_eq!(handle.volume, 0.3);
        assert!(!engine.active_tracks()[0].is_muted);
    }

    #[tokio::test]
    async fn test_resolver_failure_falls_back_to_raw_source() {
        let (engine, backend, observer) = engine();

        started_id(engine.play("/audio/missing.mp3", at("")).await);

        assert_eq!(backend.handles()[0].source, "audio/missing.mp3");
        assert!(observer.events().iter().any(|e| matches!(
            e,
            PlaybackEvent::ResolveFailed { fallback, .. } if fallback == "audio/missing.mp3"
        )));
    }

    #[tokio::test]
    async fn test_failed_fallback_leaves_registry_unchanged() {
        let (engine, backend, observer) = engine();
        backend.reject_source("missing.mp3");

        let outcome = engine.play("missing.mp3", PlayOptions::default()).await;

        assert_eq!(outcome, PlayOutcome::Aborted);
        assert_eq!(engine.active_count(), 0);
        assert!(!engine.is_playing());
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::Aborted { track, .. } if track == "missing.mp3")));
    }

    #[tokio::test]
    async fn test_failed_start_leaves_registry_unchanged() {
        let (engine, backend, observer) = engine();
        backend.fail_play("broken.mp3");

        let outcome = engine.play("broken.mp3", at("forest")).await;

        assert_eq!(outcome, PlayOutcome::Aborted);
        assert_eq!(engine.active_count(), 0);
        assert!(!engine.is_playing());
        assert_eq!(backend.created_count(), 1);
        assert_eq!(backend.live_count(), 0);
        assert!(observer.events().iter().any(|e| matches!(
            e,
            PlaybackEvent::Aborted { track, location, .. }
                if track == "broken.mp3" && location == "forest"
        )));
        assert!(!observer
            .events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::Started { .. })));

        // A healthy track afterwards still registers normally.
        started_id(engine.play("fine.mp3", at("forest")).await);
        assert_eq!(engine.active_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_aborts() {
        let (engine, backend, _) = engine();

        assert_eq!(engine.play("/", PlayOptions::default()).await, PlayOutcome::Aborted);
        assert_eq!(engine.play("", PlayOptions::default()).await, PlayOutcome::Aborted);
        assert_eq!(backend.created_count(), 0);
    }

    #[tokio::test]
    async fn test_handles_start_at_master_volume() {
        let (engine, backend, _) = engine();
        engine.set_master_volume(0.4);

        engine.play("a.mp3", at("")).await;

        assert_eq!(backend.handles()[0].volume, 0.4);
        assert_eq!(engine.active_tracks()[0].volume, 0.4);
    }

    #[tokio::test]
    async fn test_loop_and_streaming_flags_reach_backend() {
        let (engine, backend, _) = engine();

        engine
            .play("a.mp3", PlayOptions { looping: true, ..at("forest") })
            .await;

        let handle = backend.handles()[0].clone();
        assert!(handle.looping);
        assert!(handle.streaming);
        assert!(engine.active_tracks()[0].looping);
    }

    #[tokio::test]
    async fn test_stop_track_updates_playing_flag() {
        let (engine, backend, _) = engine();
        let a = started_id(engine.play("a.mp3", at("")).await);
        let b = started_id(engine.play("b.mp3", at("")).await);

        engine.stop_track(&a);
        assert!(engine.is_playing());
        engine.stop_track("trk-unknown");
        assert_eq!(engine.active_count(), 1);

        engine.stop_track(&b);
        assert!(!engine.is_playing());
        assert_eq!(backend.live_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_all_stops_every_handle() {
        let (engine, backend, _) = engine();
        engine.play("a.mp3", at("")).await;
        engine.play("b.mp3", at("forest")).await;
        engine.play("c.mp3", at("tavern")).await;

        assert_eq!(engine.stop_all_tracks(), 3);

        assert_eq!(engine.active_count(), 0);
        assert!(!engine.is_playing());
        assert!(backend.handles().iter().all(|h| h.stopped));
        assert_eq!(engine.stop_all_tracks(), 0);
    }

    #[tokio::test]
    async fn test_master_volume_skips_muted_tracks() {
        let (engine, backend, _) = engine();
        let x = started_id(engine.play("x.mp3", at("")).await);
        let y = started_id(engine.play("y.mp3", at("")).await);
        engine.toggle_mute_track(&x);

        engine.set_master_volume(0.5);

        let x_handle = backend.handles_for("x.mp3")[0].clone();
        assert!(x_handle.muted);
        assert_eq!(x_handle.volume, 1.0);
        assert_eq!(backend.handles_for("y.mp3")[0].volume, 0.5);
        assert_eq!(engine.master_volume(), 0.5);

        let views = engine.active_tracks();
        let view = |id: &str| views.iter().find(|t| t.id == id).unwrap().clone();
        assert_eq!(view(&x).volume, 1.0);
        assert_eq!(view(&y).volume, 0.5);
    }

    #[tokio::test]
    async fn test_volume_clamping() {
        let (engine, backend, _) = engine();
        let id = started_id(engine.play("a.mp3", at("")).await);

        engine.set_master_volume(1.5);
        assert_eq!(engine.master_volume(), 1.0);
        engine.set_master_volume(-0.5);
        assert_eq!(engine.master_volume(), 0.0);

        engine.adjust_track_volume(&id, 2.0);
        assert_eq!(backend.handles()[0].volume, 1.0);
        engine.adjust_track_volume(&id, -3.0);
        assert_eq!(backend.handles()[0].volume, 0.0);
        assert_eq!(engine.active_tracks()[0].volume, 0.0);
    }

    #[tokio::test]
    async fn test_adjust_muted_track_stores_without_applying() {
        let (engine, backend, observer) = engine();
        let id = started_id(engine.play("a.mp3", at("")).await);
        engine.toggle_mute_track(&id);

        engine.adjust_track_volume(&id, 0.2);

        assert_eq!(backend.handles()[0].volume, 1.0);
        assert!(backend.handles()[0].muted);
        assert_eq!(engine.active_tracks()[0].volume, 0.2);
        assert!(observer.events().contains(&PlaybackEvent::TrackVolumeChanged {
            id: id.clone(),
            level: 0.2,
            applied: false,
        }));

        // Unmuting pushes the stored volume to the handle.
        assert_eq!(engine.toggle_mute_track(&id), Some(false));
        assert_eq!(backend.handles()[0].volume, 0.2);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_noops() {
        let (engine, _, observer) = engine();

        engine.adjust_track_volume("nope", 0.5);
        assert_eq!(engine.toggle_mute_track("nope"), None);
        engine.stop_track("nope");

        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_plays_dedupe_after_resolve() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = Arc::new(GatedResolver { gate: Notify::new() });
        let engine = PlaybackEngine::new(resolver.clone(), backend.clone());

        let release = async {
            tokio::task::yield_now().await;
            resolver.gate.notify_waiters();
        };
        let (first, second, _) = futures::join!(
            engine.play("a.mp3", at("forest")),
            engine.play("a.mp3", at("forest")),
            release
        );

        let outcomes = [first, second];
        let started = outcomes
            .iter()
            .filter(|o| matches!(o, PlayOutcome::Started(_)))
            .count();
        assert_eq!(started, 1);
        assert!(outcomes.contains(&PlayOutcome::Discarded));
        assert_eq!(engine.active_count(), 1);
        // The loser may have built a handle, but it never started.
        assert_eq!(backend.live_count(), 1);
        assert!(backend.handles().iter().filter(|h| !h.playing).all(|h| h.stopped));
    }

    #[tokio::test]
    async fn test_concurrent_plays_racy_mode_allows_duplicates() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = Arc::new(GatedResolver { gate: Notify::new() });
        let settings = PlaybackSettings {
            dedupe_after_resolve: false,
            ..PlaybackSettings::default()
        };
        let engine = PlaybackEngine::with_settings(resolver.clone(), backend.clone(), settings);

        let release = async {
            tokio::task::yield_now().await;
            resolver.gate.notify_waiters();
        };
        futures::join!(
            engine.play("a.mp3", at("forest")),
            engine.play("a.mp3", at("forest")),
            release
        );

        assert_eq!(engine.active_count(), 2);
    }

    #[tokio::test]
    async fn test_stop_all_during_resolution_discards_play() {
        let backend = Arc::new(MemoryBackend::new());
        let resolver = Arc::new(GatedResolver { gate: Notify::new() });
        let engine = PlaybackEngine::new(resolver.clone(), backend.clone());

        let interrupt = async {
            tokio::task::yield_now().await;
            engine.stop_all_tracks();
            resolver.gate.notify_waiters();
        };
        let (outcome, _) = futures::join!(engine.play("a.mp3", at("forest")), interrupt);

        assert_eq!(outcome, PlayOutcome::Discarded);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(backend.created_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_construction_does_not_block_other_operations() {
        let backend = Arc::new(SlowBackend {
            inner: MemoryBackend::new(),
            delay: Duration::from_millis(400),
        });
        let engine = Arc::new(PlaybackEngine::new(
            Arc::new(ManifestResolver::new()),
            backend.clone(),
        ));

        let play = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.play("slow.mp3", at("cave")).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let before = Instant::now();
        engine.set_master_volume(0.5);
        assert_eq!(engine.active_count(), 0);
        assert!(before.elapsed() < Duration::from_millis(200));

        started_id(play.await.unwrap());
        // The volume change made during construction reaches the new handle.
        assert_eq!(backend.inner.handles()[0].volume, 0.5);
        assert_eq!(engine.active_tracks()[0].volume, 0.5);
    }

    #[tokio::test]
    async fn test_stop_all_during_construction_drops_handle() {
        let backend = Arc::new(SlowBackend {
            inner: MemoryBackend::new(),
            delay: Duration::from_millis(200),
        });
        let engine = PlaybackEngine::new(Arc::new(ManifestResolver::new()), backend.clone());

        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.stop_all_tracks();
        };
        let (outcome, _) = futures::join!(engine.play("a.mp3", at("forest")), interrupt);

        assert_eq!(outcome, PlayOutcome::Discarded);
        assert_eq!(engine.active_count(), 0);
        let handle = backend.inner.handles()[0].clone();
        assert!(!handle.playing);
        assert!(handle.stopped);
    }
}
