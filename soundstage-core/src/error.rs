//! Error types for soundstage-core.

use thiserror::Error;

/// Main error type for the soundstage-core library.
///
/// None of these reach façade callers: the playback engine converts them into
/// logged [`PlaybackEvent`](crate::events::PlaybackEvent)s.
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Failed to load config '{0}': {1}")]
    ConfigLoad(String, String),

    #[error("Failed to parse config '{0}': {1}")]
    ConfigParse(String, String),

    #[error("Config validation error in '{0}': {1}")]
    ConfigValidation(String, String),

    // Asset resolution errors
    #[error("Asset not found: {category}/{name}")]
    AssetNotFound { category: String, name: String },

    #[error("Failed to parse asset manifest '{0}': {1}")]
    ManifestParse(String, String),

    // Backend errors
    #[error("No audio output device available")]
    NoAudioDevice,

    #[error("Failed to load sound {0}: {1}")]
    SoundLoad(String, String),

    #[error("Failed to play sound: {0}")]
    SoundPlayback(String),

    #[error("Sound source rejected: {0}")]
    SourceRejected(String),

    // Registry errors
    #[error("Failed to acquire registry lock")]
    RegistryLock,

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
