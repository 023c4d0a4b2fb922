mod file_config;

pub use file_config::{CatalogFileConfig, FeaturedFileConfig, FileConfig, SearchFileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:8080";

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub logging_level: Option<String>,
    pub share_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub logging_level: LevelFilter,
    pub share_base_url: String,

    pub catalog: CatalogSettings,
    pub search: SearchSettings,
    pub featured: FeaturedSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub home_limit: usize,
    pub related_limit: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            home_limit: 100,
            related_limit: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// Quiet period after the last keystroke before a query is issued
    pub debounce: Duration,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedSettings {
    pub rotation_interval: Duration,
    /// Entries taken from each of series and films
    pub per_kind: usize,
}

impl Default for FeaturedSettings {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_millis(8000),
            per_kind: 3,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow::anyhow!("db_path must be specified via --db or in config file"))?;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let logging_level = match file.logging_level.or_else(|| cli.logging_level.clone()) {
            Some(level) => parse_logging_level(&level)?,
            None => LevelFilter::INFO,
        };

        let share_base_url = file
            .share_base_url
            .or_else(|| cli.share_base_url.clone())
            .unwrap_or_else(|| DEFAULT_SHARE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let catalog_file = file.catalog.unwrap_or_default();
        let catalog_defaults = CatalogSettings::default();
        let catalog = CatalogSettings {
            home_limit: catalog_file.home_limit.unwrap_or(catalog_defaults.home_limit),
            related_limit: catalog_file
                .related_limit
                .unwrap_or(catalog_defaults.related_limit),
        };

        let search_file = file.search.unwrap_or_default();
        let search_defaults = SearchSettings::default();
        let search = SearchSettings {
            debounce: search_file
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(search_defaults.debounce),
            max_results: search_file.max_results.unwrap_or(search_defaults.max_results),
        };

        let featured_file = file.featured.unwrap_or_default();
        let featured_defaults = FeaturedSettings::default();
        let featured = FeaturedSettings {
            rotation_interval: featured_file
                .rotation_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(featured_defaults.rotation_interval),
            per_kind: featured_file.per_kind.unwrap_or(featured_defaults.per_kind),
        };

        if catalog.home_limit == 0 || catalog.related_limit == 0 {
            bail!("catalog limits must be greater than zero");
        }
        if search.debounce.is_zero() || search.max_results == 0 {
            bail!("search debounce_ms and max_results must be greater than zero");
        }
        if featured.rotation_interval.is_zero() || featured.per_kind == 0 {
            bail!("featured rotation_interval_ms and per_kind must be greater than zero");
        }

        Ok(Self {
            db_path,
            logging_level,
            share_base_url,
            catalog,
            search,
            featured,
        })
    }
}

fn parse_logging_level(s: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(s).map_err(|_| anyhow::anyhow!("Invalid logging level: {}", s))
}
