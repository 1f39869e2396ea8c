//! Shared kira audio output.
//!
//! kira mixes every sound through one `AudioManager` (one cpal stream), so the
//! manager is created lazily once per process and shared behind a mutex.
//! Playback state is not stored here; only the output device lives globally.

use std::sync::{Mutex, OnceLock};

use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend};

static AUDIO_MANAGER: OnceLock<Option<Mutex<AudioManager<DefaultBackend>>>> = OnceLock::new();

fn audio_manager() -> Option<&'static Mutex<AudioManager<DefaultBackend>>> {
    AUDIO_MANAGER
        .get_or_init(|| {
            match AudioManager::<DefaultBackend>::new(AudioManagerSettings::default()) {
                Ok(manager) => Some(Mutex::new(manager)),
                Err(e) => {
                    tracing::error!("Failed to initialize audio output: {}", e);
                    None
                }
            }
        })
        .as_ref()
}

/// Returns whether an audio output device could be opened.
pub fn is_audio_available() -> bool {
    audio_manager().is_some()
}

/// Runs `f` with the shared manager, or returns `None` if no device is available.
pub fn with_audio_manager<T>(f: impl FnOnce(&mut AudioManager<DefaultBackend>) -> T) -> Option<T> {
    let manager = audio_manager()?;
    let mut guard = manager.lock().ok()?;
    Some(f(&mut guard))
}

/// Converts a linear amplitude (0.0–1.0) to kira decibels.
pub fn volume_to_db(volume: f32) -> Decibels {
    if volume.is_nan() || volume <= 0.0 {
        return Decibels::SILENCE;
    }
    Decibels(20.0 * volume.min(1.0).log10())
}
