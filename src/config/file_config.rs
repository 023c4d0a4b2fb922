use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub logging_level: Option<String>,
    pub share_base_url: Option<String>,

    // Feature configs
    pub catalog: Option<CatalogFileConfig>,
    pub search: Option<SearchFileConfig>,
    pub featured: Option<FeaturedFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogFileConfig {
    pub home_limit: Option<usize>,
    pub related_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchFileConfig {
    pub debounce_ms: Option<u64>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FeaturedFileConfig {
    pub rotation_interval_ms: Option<u64>,
    pub per_kind: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
