//! Soundstage Core - location-scoped track playback for tabletop sessions.
//!
//! This library provides:
//! - A track catalog of reusable (name, url) definitions
//! - An active track registry that owns every playing sound handle
//! - A playback engine with de-duplication, scoped replacement, and
//!   volume/mute control
//! - Asset resolvers (manifest, directory search, chains)
//! - Sound backends: kira for real output, memory for headless use
//! - The `Soundboard` façade consumed by UI callers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use soundstage_core::prelude::*;
//!
//! # async fn run() {
//! let resolver = Arc::new(DirectoryResolver::new(vec!["assets".into()]));
//! let engine = PlaybackEngine::new(resolver, Arc::new(KiraBackend::new()));
//! let board = Soundboard::new(engine);
//!
//! board.add_track(NewTrack::new("amb", "amb.mp3"));
//! board.play("amb.mp3", PlayRequest::at("forest").with_loop()).await;
//! board.play("village.mp3", PlayRequest::at("forest").replacing()).await;
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engines;
pub mod error;
pub mod events;
pub mod playback;
pub mod registry;
pub mod resolver;
pub mod soundboard;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::catalog::{NewTrack, TrackCatalog, TrackDefinition};
    pub use crate::config::{AudioConfig, ConfigLoader, TrackEntry};
    pub use crate::engines::{
        HandleOptions, KiraBackend, MemoryBackend, SoundBackend, SoundHandle,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{PlaybackEvent, PlaybackObserver, TracingObserver};
    pub use crate::playback::{PlayOptions, PlayOutcome, PlaybackEngine, PlaybackSettings};
    pub use crate::registry::ActiveTrackView;
    pub use crate::resolver::{
        AssetCategory, AssetResolver, ChainResolver, DirectoryResolver, ManifestResolver,
    };
    pub use crate::soundboard::{PlayRequest, Soundboard, GLOBAL_LOCATION};
}
