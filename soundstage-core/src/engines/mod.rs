//! Sound backends: the external audio engine behind each active track.
//!
//! A [`SoundBackend`] turns a resolved source into a [`SoundHandle`]. Every
//! handle is owned by exactly one registry entry and is stopped when that
//! entry is removed.

pub mod audio_output;
mod kira_backend;
mod memory;

pub use kira_backend::KiraBackend;
pub use memory::{HandleRecord, MemoryBackend};

use crate::error::Result;

/// Options applied when a handle is constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleOptions {
    pub looping: bool,
    /// Linear amplitude, 0.0–1.0.
    pub volume: f32,
    /// Stream from disk instead of decoding the whole file up front.
    pub streaming: bool,
}

/// A playable sound owned by one active track.
pub trait SoundHandle: Send {
    /// Starts output. Called once, right after construction.
    fn play(&mut self) -> Result<()>;

    fn stop(&mut self);

    /// Forces engine-level silence without touching the stored volume.
    fn set_muted(&mut self, muted: bool);

    /// Sets linear amplitude (0.0–1.0). Has no audible effect while muted.
    fn set_volume(&mut self, volume: f32);
}

/// Factory for [`SoundHandle`]s.
pub trait SoundBackend: Send + Sync {
    /// Creates a handle from the first usable source. Nothing plays until
    /// [`SoundHandle::play`] is called.
    fn create(&self, sources: &[String], options: HandleOptions) -> Result<Box<dyn SoundHandle>>;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;
}
