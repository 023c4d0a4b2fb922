use crate::catalog_store::FilmLink;
use serde::Serialize;
use std::collections::BTreeMap;

/// Group key for links that carry no language.
pub const DEFAULT_FILM_LANGUAGE: &str = "English";

/// A film's playback links partitioned by language.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilmLinkGroups {
    groups: BTreeMap<String, Vec<FilmLink>>,
}

impl FilmLinkGroups {
    /// Keeps the incoming order inside each group.
    pub fn build(links: impl IntoIterator<Item = FilmLink>) -> Self {
        let mut groups: BTreeMap<String, Vec<FilmLink>> = BTreeMap::new();
        for link in links {
            let key = link
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_FILM_LANGUAGE.to_string());
            groups.entry(key).or_default().push(link);
        }
        Self { groups }
    }

    /// Available languages, sorted.
    pub fn languages(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn default_language(&self) -> Option<&str> {
        self.groups.keys().next().map(String::as_str)
    }

    pub fn links_for(&self, language: &str) -> &[FilmLink] {
        self.groups.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, language: &str) -> bool {
        self.groups.contains_key(language)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
