//! Configuration validation.

use std::collections::HashSet;

use crate::config::types::{AudioConfig, TrackEntry};
use crate::error::{Error, Result};

/// Validator for engine configurations.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates an engine configuration.
    pub fn validate(&self, config: &AudioConfig) -> Result<()> {
        self.validate_master_volume(config)?;

        let mut seen = HashSet::new();
        for (index, track) in config.tracks.iter().enumerate() {
            self.validate_track(index, track)?;
            if !seen.insert(track.name.as_str()) {
                return Err(Error::ConfigValidation(
                    format!("tracks[{}].name", index),
                    format!("Duplicate track name '{}'", track.name),
                ));
            }
        }

        Ok(())
    }

    fn validate_master_volume(&self, config: &AudioConfig) -> Result<()> {
        if !config.master_volume.is_finite() || !(0.0..=1.0).contains(&config.master_volume) {
            return Err(Error::ConfigValidation(
                "master_volume".to_string(),
                format!("Must be between 0.0 and 1.0, got {}", config.master_volume),
            ));
        }
        Ok(())
    }

    fn validate_track(&self, index: usize, track: &TrackEntry) -> Result<()> {
        if track.name.trim().is_empty() {
            return Err(Error::ConfigValidation(
                format!("tracks[{}].name", index),
                "Name cannot be empty".to_string(),
            ));
        }
        if track.url.trim().is_empty() {
            return Err(Error::ConfigValidation(
                format!("tracks[{}].url", index),
                format!("Track '{}' has no url", track.name),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
