use crate::catalog_store::CatalogEntry;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Label of the identity filter.
pub const ALL_GENRES: &str = "All";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum GenreSelection {
    #[default]
    All,
    Named(String),
}

impl GenreSelection {
    pub fn from_label(label: &str) -> Self {
        if label == ALL_GENRES {
            GenreSelection::All
        } else {
            GenreSelection::Named(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GenreSelection::All => ALL_GENRES,
            GenreSelection::Named(name) => name,
        }
    }

    /// Exact, case-sensitive match on genre names.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            GenreSelection::All => true,
            GenreSelection::Named(name) => entry.genres.contains(name),
        }
    }
}

impl fmt::Display for GenreSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn filter_by_genre(items: &[CatalogEntry], selection: &GenreSelection) -> Vec<CatalogEntry> {
    items
        .iter()
        .filter(|e| selection.matches(e))
        .cloned()
        .collect()
}

/// Every genre name present across `items`, sorted.
pub fn genre_facet<'a>(items: impl IntoIterator<Item = &'a CatalogEntry>) -> Vec<String> {
    items
        .into_iter()
        .flat_map(|e| e.genres.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::entry_with_genres;

    fn items() -> Vec<CatalogEntry> {
        vec![
            entry_with_genres("a", &["Action", "Drama"]),
            entry_with_genres("b", &["Comedy"]),
            entry_with_genres("c", &[]),
            entry_with_genres("d", &["action"]),
        ]
    }

    #[test]
    fn test_all_is_identity() {
        let items = items();
        assert_eq!(filter_by_genre(&items, &GenreSelection::All), items);
        assert_eq!(
            filter_by_genre(&items, &GenreSelection::from_label("All")),
            items
        );
    }

    #[test]
    fn test_named_is_exact_match() {
        let filtered = filter_by_genre(&items(), &GenreSelection::from_label("Action"));
        let ids: Vec<&str> = filtered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        assert!(filter_by_genre(&items(), &GenreSelection::from_label("Horror")).is_empty());
    }

    #[test]
    fn test_facet_is_sorted_union() {
        assert_eq!(
            genre_facet(&items()),
            vec!["Action", "Comedy", "Drama", "action"]
        );
    }
}
