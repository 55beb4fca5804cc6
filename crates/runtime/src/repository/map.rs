//! Map repositories backed by TOML files or by memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use game_content::{MapEntry, MapLoader};
use game_core::MapConfig;

use super::{MapRepository, RepositoryError, Result};

/// Reads `<name>.toml` files from a directory.
pub struct FileMapRepository {
    dir: PathBuf,
}

impl FileMapRepository {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MapRepository for FileMapRepository {
    fn load(&self, name: &str) -> Result<MapConfig> {
        let path = MapLoader::path_for(&self.dir, name);
        if !path.exists() {
            return Err(RepositoryError::MapNotFound(name.to_owned()));
        }
        let config =
            MapLoader::load(&path).map_err(|e| RepositoryError::Content(format!("{e:#}")))?;

        tracing::debug!(target: "runtime::repository", map = name, "Loaded map {}", path.display());
        Ok(config)
    }

    fn list(&self) -> Result<Vec<MapEntry>> {
        MapLoader::list(&self.dir).map_err(|e| RepositoryError::Content(format!("{e:#}")))
    }
}

/// Fixed set of maps for testing and embedding.
#[derive(Default)]
pub struct InMemoryMapRepository {
    maps: BTreeMap<String, MapConfig>,
}

impl InMemoryMapRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a map. Defaults are applied as if loaded from disk.
    pub fn with_map(mut self, name: impl Into<String>, config: MapConfig) -> Self {
        self.maps.insert(name.into(), config.normalized());
        self
    }
}

impl MapRepository for InMemoryMapRepository {
    fn load(&self, name: &str) -> Result<MapConfig> {
        self.maps
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::MapNotFound(name.to_owned()))
    }

    fn list(&self) -> Result<Vec<MapEntry>> {
        let mut maps: Vec<MapEntry> = self
            .maps
            .iter()
            .map(|(name, config)| MapEntry {
                name: name.clone(),
                difficulty: config.difficulty,
            })
            .collect();
        // BTreeMap order already breaks ties by name.
        maps.sort_by_key(|entry| entry.difficulty);
        Ok(maps)
    }
}
