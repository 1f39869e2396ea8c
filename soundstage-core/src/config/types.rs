//! Configuration types for `soundstage.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::NewTrack;
use crate::playback::PlaybackSettings;

/// Complete engine configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
    /// Stream sources instead of decoding them fully before playback.
    #[serde(default = "default_true")]
    pub streaming: bool,
    /// Re-check for a duplicate track after asset resolution.
    #[serde(default = "default_true")]
    pub dedupe_after_resolve: bool,
    /// Directories searched for audio assets. Relative paths are resolved
    /// against the config file's directory.
    #[serde(default)]
    pub asset_roots: Vec<PathBuf>,
    /// Optional JSON manifest mapping asset names to relative paths.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    /// Tracks registered in the catalog at startup.
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
    /// Full path to the YAML file this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_master_volume() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: default_master_volume(),
            streaming: true,
            dedupe_after_resolve: true,
            asset_roots: Vec::new(),
            manifest: None,
            tracks: Vec::new(),
            source_path: None,
        }
    }
}

impl AudioConfig {
    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            master_volume: self.master_volume,
            streaming: self.streaming,
            dedupe_after_resolve: self.dedupe_after_resolve,
        }
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        self.source_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."))
    }

    /// Asset roots with relative entries joined onto [`Self::base_dir`].
    pub fn resolved_asset_roots(&self) -> Vec<PathBuf> {
        self.asset_roots
            .iter()
            .map(|root| self.resolve_path(root))
            .collect()
    }

    pub fn resolved_manifest(&self) -> Option<PathBuf> {
        self.manifest.as_ref().map(|m| self.resolve_path(m))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }
}

/// A catalog entry in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackEntry {
    pub name: String,
    pub url: String,
}

impl From<TrackEntry> for NewTrack {
    fn from(entry: TrackEntry) -> Self {
        NewTrack::new(entry.name, entry.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: AudioConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.master_volume, 1.0);
        assert!(config.streaming);
        assert!(config.dedupe_after_resolve);
        assert!(config.tracks.is_empty());
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let config = AudioConfig {
            asset_roots: vec![PathBuf::from("assets"), PathBuf::from("/abs/sounds")],
            manifest: Some(PathBuf::from("assets/manifest.json")),
            source_path: Some(PathBuf::from("/srv/table/soundstage.yaml")),
            ..AudioConfig::default()
        };

        assert_eq!(
            config.resolved_asset_roots(),
            vec![PathBuf::from("/srv/table/assets"), PathBuf::from("/abs/sounds")]
        );
        assert_eq!(
            config.resolved_manifest(),
            Some(PathBuf::from("/srv/table/assets/manifest.json"))
        );
    }
}
