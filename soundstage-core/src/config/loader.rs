//! YAML configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::AudioConfig;
use crate::config::validator::ConfigValidator;
use crate::error::{Error, Result};

/// File name looked up by [`ConfigLoader::in_dir`].
pub const DEFAULT_CONFIG_FILE: &str = "soundstage.yaml";

/// Loads and validates `soundstage.yaml`.
pub struct ConfigLoader {
    config_path: PathBuf,
    validator: ConfigValidator,
}

impl ConfigLoader {
    /// Creates a loader for an explicit config file path.
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            validator: ConfigValidator::new(),
        }
    }

    /// Creates a loader for `dir/soundstage.yaml`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_CONFIG_FILE))
    }

    /// Loads and validates the config file.
    pub fn load(&self) -> Result<AudioConfig> {
        let config = Self::load_from_path(&self.config_path)?;
        self.validator.validate(&config)?;
        Ok(config)
    }

    /// Like [`Self::load`], but returns defaults when the file does not exist.
    /// A file that exists but is broken is still an error.
    pub fn load_or_default(&self) -> Result<AudioConfig> {
        if !self.config_path.exists() {
            tracing::info!("No config at {:?}, using defaults", self.config_path);
            return Ok(AudioConfig::default());
        }
        self.load()
    }

    /// Parses config text without touching the filesystem.
    pub fn parse(&self, content: &str, origin: &str) -> Result<AudioConfig> {
        let config: AudioConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(origin.to_string(), e.to_string()))?;
        self.validator.validate(&config)?;
        Ok(config)
    }

    /// Loads config from a specific path, setting the source_path field.
    fn load_from_path(path: &Path) -> Result<AudioConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;

        let mut config: AudioConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))?;

        config.source_path = Some(path.to_path_buf());
        tracing::info!("Loaded config {:?} ({} tracks)", path, config.tracks.len());
        Ok(config)
    }
}
