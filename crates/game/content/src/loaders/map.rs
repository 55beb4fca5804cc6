//! Map configuration loader.
//!
//! Each map is a single TOML file in the map directory. The file stem is the
//! map name shown to players.

use std::path::{Path, PathBuf};

use game_core::MapConfig;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

const MAP_EXTENSION: &str = "toml";

/// One selectable map, as shown in a map menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    pub name: String,
    pub difficulty: i32,
}

/// Only the header is needed to list maps.
#[derive(Deserialize)]
struct MapHeader {
    #[serde(default)]
    difficulty: i32,
}

/// Loader for map configuration from TOML files.
pub struct MapLoader;

impl MapLoader {
    /// Path of the file backing `name` inside `dir`.
    pub fn path_for(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{MAP_EXTENSION}"))
    }

    /// Load a map config from a TOML file.
    ///
    /// Non-positive factory and scrap counts become 1 and a non-positive
    /// collapse duration becomes 60 seconds. Tables too small for the sight
    /// window are rejected.
    pub fn load(path: &Path) -> LoadResult<MapConfig> {
        let content = read_file(path)?;
        let config: MapConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse map TOML {}: {}", path.display(), e))?;

        let config = config.normalized();
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid map {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Load the map called `name` from `dir`.
    pub fn load_named(dir: &Path, name: &str) -> LoadResult<MapConfig> {
        Self::load(&Self::path_for(dir, name))
    }

    /// List every map in `dir`, easiest first. Ties are ordered by name.
    pub fn list(dir: &Path) -> LoadResult<Vec<MapEntry>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read map directory {}: {}", dir.display(), e))?;

        let mut maps = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(MAP_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = read_file(&path)?;
            let header: MapHeader = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse map TOML {}: {}", path.display(), e))?;
            maps.push(MapEntry {
                name: name.to_owned(),
                difficulty: header.difficulty,
            });
        }

        maps.sort_by(|a, b| {
            a.difficulty
                .cmp(&b.difficulty)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(maps)
    }
}
