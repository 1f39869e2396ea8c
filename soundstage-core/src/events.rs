//! Playback events
//!
//! The engine never returns errors to its callers. Everything worth knowing
//! (recovered resolution failures, aborted plays, discarded duplicates) is
//! emitted as a [`PlaybackEvent`] to an injectable [`PlaybackObserver`].

use serde::{Deserialize, Serialize};

/// Why a resolved play was dropped before reaching the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscardReason {
    /// Another play for the same `(track, location)` finished resolving first.
    Duplicate { existing_id: String },
    /// `stop_all_tracks` ran while the source was being resolved.
    Superseded,
}

/// Events emitted by the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    Started {
        id: String,
        track: String,
        location: String,
        source: String,
        looping: bool,
    },

    /// A play request hit a muted instance and unmuted it in place.
    Unmuted { id: String, track: String, location: String },

    /// A play request hit an instance that is already audible.
    AlreadyPlaying { id: String, track: String, location: String },

    /// Removed by a scoped replace.
    Replaced { id: String, track: String, location: String },

    /// The resolver failed; playback continues with the raw source.
    ResolveFailed { track: String, fallback: String, error: String },

    /// Playback was abandoned; nothing was added to the registry.
    Aborted { track: String, location: String, reason: String },

    Discarded { track: String, location: String, reason: DiscardReason },

    Stopped { id: String, track: String, location: String },

    StoppedAll { count: usize },

    MasterVolumeChanged { level: f32 },

    /// `applied` is false when the track is muted and only the stored value changed.
    TrackVolumeChanged { id: String, level: f32, applied: bool },

    MuteToggled { id: String, muted: bool },
}

/// Sink for [`PlaybackEvent`]s.
pub trait PlaybackObserver: Send + Sync {
    fn on_event(&self, event: &PlaybackEvent);
}

/// Default observer: renders events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PlaybackObserver for TracingObserver {
    fn on_event(&self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::Started { id, track, location, source, looping } => {
                tracing::info!(%id, %track, %location, %source, looping, "Started track");
            }
            PlaybackEvent::Unmuted { id, track, location } => {
                tracing::info!(%id, %track, %location, "Re-triggered muted track, unmuting");
            }
            PlaybackEvent::AlreadyPlaying { id, track, location } => {
                tracing::debug!(%id, %track, %location, "Track already playing");
            }
            PlaybackEvent::Replaced { id, track, location } => {
                tracing::info!(%id, %track, %location, "Replaced track");
            }
            PlaybackEvent::ResolveFailed { track, fallback, error } => {
                tracing::warn!(
                    %track,
                    %fallback,
                    %error,
                    "Failed to resolve track, using raw source"
                );
            }
            PlaybackEvent::Aborted { track, location, reason } => {
                tracing::error!(%track, %location, %reason, "Failed to play track");
            }
            PlaybackEvent::Discarded { track, location, reason } => {
                tracing::warn!(%track, %location, ?reason, "Discarded resolved track");
            }
            PlaybackEvent::Stopped { id, track, location } => {
                tracing::info!(%id, %track, %location, "Stopped track");
            }
            PlaybackEvent::StoppedAll { count } => {
                tracing::info!(count, "Stopped all tracks");
            }
            PlaybackEvent::MasterVolumeChanged { level } => {
                tracing::debug!(level, "Set master volume");
            }
            PlaybackEvent::TrackVolumeChanged { id, level, applied } => {
                tracing::debug!(%id, level, applied, "Set track volume");
            }
            PlaybackEvent::MuteToggled { id, muted } => {
                tracing::debug!(%id, muted, "Toggled mute");
            }
        }
    }
}
