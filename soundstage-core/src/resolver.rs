//! Asset resolution: maps a logical track name to a playable source.
//!
//! The playback engine calls [`AssetResolver::resolve`] once per first-time
//! play. This is the only asynchronous step in a play request.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Kind of asset being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Audio,
}

impl AssetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves logical asset names to playable sources.
#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(&self, category: AssetCategory, name: &str) -> Result<String>;
}

fn not_found(category: AssetCategory, name: &str) -> Error {
    Error::AssetNotFound {
        category: category.to_string(),
        name: name.to_string(),
    }
}

/// Resolver backed by an explicit name → source map.
#[derive(Debug, Clone, Default)]
pub struct ManifestResolver {
    entries: HashMap<String, String>,
}

impl ManifestResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(name.into(), source.into());
    }

    /// Loads a JSON manifest mapping asset names to paths relative to `base_dir`.
    ///
    /// Entries whose file does not exist are skipped.
    pub fn from_manifest_file(base_dir: &Path, manifest_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(manifest_path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&contents)
            .map_err(|e| Error::ManifestParse(manifest_path.display().to_string(), e.to_string()))?;

        let mut resolver = Self::new();
        for (name, rel_path) in raw {
            let abs_path = base_dir.join(&rel_path);
            if abs_path.exists() {
                resolver.insert(name, abs_path.display().to_string());
            } else {
                tracing::debug!("Manifest entry {} points at missing file {:?}", name, abs_path);
            }
        }
        tracing::info!(
            "Loaded asset manifest: {} entries from {:?}",
            resolver.len(),
            manifest_path
        );
        Ok(resolver)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AssetResolver for ManifestResolver {
    async fn resolve(&self, category: AssetCategory, name: &str) -> Result<String> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(category, name))
    }
}

/// Resolver that searches asset directories on disk.
///
/// Search order per root: `root/name` → `root/<category>/name`. The first
/// existing file wins.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    roots: Vec<PathBuf>,
}

impl DirectoryResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

#[async_trait]
impl AssetResolver for DirectoryResolver {
    async fn resolve(&self, category: AssetCategory, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(not_found(category, name));
        }

        for root in &self.roots {
            for candidate in [root.join(name), root.join(category.as_str()).join(name)] {
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    return Ok(candidate.display().to_string());
                }
            }
        }

        Err(not_found(category, name))
    }
}

/// Tries each resolver in order; the first success wins.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn AssetResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }
}

#[async_trait]
impl AssetResolver for ChainResolver {
    async fn resolve(&self, category: AssetCategory, name: &str) -> Result<String> {
        let mut last_error = None;
        for resolver in &self.resolvers {
            match resolver.resolve(category, name).await {
                Ok(source) => return Ok(source),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| not_found(category, name)))
    }
}
