//! Pipeline configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coloring::ColoringStrategy;
use crate::error::{Error, Result};
use crate::partition::default_workers;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Worker count for every parallel phase
    pub workers: usize,
    pub coloring_strategy: ColoringStrategy,
    /// Flush each aggregation worker's running intersection after this many colorings
    pub checkpoint_every: Option<usize>,
    /// Show progress bars
    pub progress: bool,
    /// Root of the artifact cache
    pub cache_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            coloring_strategy: ColoringStrategy::default(),
            checkpoint_every: None,
            progress: true,
            cache_dir: PathBuf::from("down-arrow-cache"),
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            workers = 3
            coloring_strategy = "exhaustive"
            "#,
        )
        .unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.coloring_strategy, ColoringStrategy::Exhaustive);
        assert_eq!(config.checkpoint_every, None);
        assert!(config.progress);
        assert_eq!(config.cache_dir, PipelineConfig::default().cache_dir);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PipelineConfig::from_toml("worker = 3").is_err());
    }

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }
}
