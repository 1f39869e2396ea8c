//! Track catalog: reusable (name, url) definitions registered ahead of playback.

use serde::{Deserialize, Serialize};

/// A registered track that is not necessarily playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// Input for [`TrackCatalog::add`]. The id is generated on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub name: String,
    pub url: String,
}

impl NewTrack {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// In-memory list of known track definitions.
///
/// Definitions are never mutated or removed once added.
#[derive(Debug, Default)]
pub struct TrackCatalog {
    tracks: Vec<TrackDefinition>,
    next_id: u64,
}

impl TrackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition and returns a copy with its generated id.
    pub fn add(&mut self, track: NewTrack) -> TrackDefinition {
        self.next_id += 1;
        let definition = TrackDefinition {
            id: format!("def-{}", self.next_id),
            name: track.name,
            url: track.url,
        };
        tracing::debug!(
            "Registered track '{}' ({}) as {}",
            definition.name,
            definition.url,
            definition.id
        );
        self.tracks.push(definition.clone());
        definition
    }

    /// Returns a snapshot of every registered definition in insertion order.
    pub fn snapshot(&self) -> Vec<TrackDefinition> {
        self.tracks.clone()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
