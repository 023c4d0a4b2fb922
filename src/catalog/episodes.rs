//! Episode list view model: one row per declared episode, with links
//! flattened per platform and language/season facets.

use crate::catalog_store::{CatalogEntry, EpisodeRecord, MAX_EPISODE_COUNT};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const DEFAULT_EPISODE_MINUTES: u32 = 24;
pub const UNKNOWN_LANGUAGE: &str = "Unknown";
pub const DEFAULT_SEASON: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeRow {
    pub number: u32,
    pub title: String,
    pub thumbnail: String,
    pub duration_minutes: u32,
    pub language: String,
    pub season: u32,
    /// platform -> url
    pub links: BTreeMap<String, String>,
    /// false for synthesized placeholders
    pub available: bool,
}

/// Language/season filter. `None` (or a blank language) leaves that axis unfiltered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeSelection {
    pub language: Option<String>,
    pub season: Option<u32>,
}

impl EpisodeSelection {
    pub fn matches(&self, row: &EpisodeRow) -> bool {
        let language_ok = match self.language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => row.language.to_lowercase() == lang.to_lowercase(),
            _ => true,
        };
        let season_ok = self.season.map_or(true, |s| row.season == s);
        language_ok && season_ok
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeGrouping {
    rows: Vec<EpisodeRow>,
    languages: Vec<String>,
    seasons: Vec<u32>,
}

impl EpisodeGrouping {
    /// Builds exactly `series.episode_count` rows numbered from 1.
    ///
    /// When several stored episodes share a number, the first one (in the
    /// order given) fills the row.
    pub fn build(series: &CatalogEntry, stored: &[EpisodeRecord]) -> Self {
        let mut by_number: HashMap<u32, &EpisodeRecord> = HashMap::new();
        for record in stored {
            by_number.entry(record.episode_number).or_insert(record);
        }

        let thumbnail = series.image_ref().to_string();
        let rows = (1..=series.episode_count.min(MAX_EPISODE_COUNT))
            .map(|number| match by_number.get(&number) {
                Some(record) => EpisodeRow {
                    number,
                    title: record
                        .title
                        .clone()
                        .unwrap_or_else(|| generic_title(number)),
                    thumbnail: thumbnail.clone(),
                    duration_minutes: record.duration_minutes.unwrap_or(DEFAULT_EPISODE_MINUTES),
                    language: record
                        .language
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
                    season: record.season.unwrap_or(DEFAULT_SEASON),
                    links: flatten_links(record),
                    available: true,
                },
                None => EpisodeRow {
                    number,
                    title: generic_title(number),
                    thumbnail: thumbnail.clone(),
                    duration_minutes: DEFAULT_EPISODE_MINUTES,
                    language: UNKNOWN_LANGUAGE.to_string(),
                    season: DEFAULT_SEASON,
                    links: BTreeMap::new(),
                    available: false,
                },
            })
            .collect();

        let mut seen = HashSet::new();
        let languages = stored
            .iter()
            .filter_map(|r| r.language.as_deref())
            .filter(|lang| !lang.is_empty())
            .filter(|lang| seen.insert(*lang))
            .map(str::to_string)
            .collect();

        let seasons = stored
            .iter()
            .map(|r| r.season.unwrap_or(DEFAULT_SEASON))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            rows,
            languages,
            seasons,
        }
    }

    pub fn rows(&self) -> &[EpisodeRow] {
        &self.rows
    }

    /// Distinct languages in the order first seen.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Distinct seasons, ascending.
    pub fn seasons(&self) -> &[u32] {
        &self.seasons
    }

    /// First known language (unfiltered if none) and first season (or 1).
    pub fn default_selection(&self) -> EpisodeSelection {
        EpisodeSelection {
            language: self.languages.first().cloned(),
            season: Some(self.seasons.first().copied().unwrap_or(DEFAULT_SEASON)),
        }
    }

    pub fn visible(&self, selection: &EpisodeSelection) -> Vec<&EpisodeRow> {
        self.rows.iter().filter(|r| selection.matches(r)).collect()
    }
}

fn generic_title(number: u32) -> String {
    format!("Episode {}", number)
}

/// Later links for the same platform replace earlier ones.
fn flatten_links(record: &EpisodeRecord) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();
    for link in &record.links {
        links.insert(link.platform.clone(), link.url.clone());
    }
    links
}
