//! Catalog models as the rest of the crate sees them.
//!
//! Every value here has already been through the row parsers in
//! `validation.rs`, so consumers can rely on the documented shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Image reference used when an entry carries neither a URL nor a stored file.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Upper bound on the declared episode count of a series.
pub const MAX_EPISODE_COUNT: u32 = 10_000;

// =============================================================================
// Enumerations
// =============================================================================

/// Which of the two catalog collections an entry lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Series,
    Film,
}

impl EntryKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntryKind::Series => "series",
            EntryKind::Film => "films",
        }
    }

    pub fn genre_table(&self) -> &'static str {
        match self {
            EntryKind::Series => "series_genres",
            EntryKind::Film => "film_genres",
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryKind::Series => "series",
            EntryKind::Film => "film",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "series" => Some(EntryKind::Series),
            "film" => Some(EntryKind::Film),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

/// Release lifecycle of an entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Ongoing,
    Completed,
    Upcoming,
}

impl LifecycleStatus {
    /// Parses the stored value, case-insensitively.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ongoing" => Some(LifecycleStatus::Ongoing),
            "completed" => Some(LifecycleStatus::Completed),
            "upcoming" => Some(LifecycleStatus::Upcoming),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Ongoing => "ongoing",
            LifecycleStatus::Completed => "completed",
            LifecycleStatus::Upcoming => "upcoming",
        }
    }
}

// =============================================================================
// Entries
// =============================================================================

/// A series or a film.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: EntryKind,
    pub title: String,
    pub description: Option<String>,
    pub synopsis: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_file_path: Option<String>,
    /// 0.0 ..= 10.0 when present
    pub rating: Option<f64>,
    pub release_year: Option<i32>,
    pub status: Option<LifecycleStatus>,
    /// Declared number of episodes. Always 0 for films.
    pub episode_count: u32,
    pub is_archived: bool,
    /// Resolved genre names; filled in by the aggregator, empty as returned by the backend.
    pub genres: BTreeSet<String>,
}

impl CatalogEntry {
    /// The image a presentation layer should show for this entry.
    pub fn image_ref(&self) -> &str {
        self.thumbnail_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.thumbnail_file_path.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(PLACEHOLDER_IMAGE)
    }
}

// =============================================================================
// Episodes and links
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeLink {
    pub platform: String,
    pub url: String,
}

/// An episode row as stored, with its links in insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: String,
    pub series_id: String,
    pub episode_number: u32,
    pub title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub season: Option<u32>,
    pub language: Option<String>,
    pub links: Vec<EpisodeLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmLink {
    pub id: String,
    pub platform: String,
    pub url: String,
    pub quality: Option<String>,
    pub language: Option<String>,
}

/// One row of an entry's genre association. `name` is `None` when the
/// association points at a genre that no longer resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenreAssociation {
    pub genre_id: String,
    pub name: Option<String>,
}

// =============================================================================
// Discussion
// =============================================================================

/// The entry a comment belongs to. A comment always has exactly one.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CommentTarget {
    Series(String),
    Film(String),
}

impl CommentTarget {
    pub fn new(kind: EntryKind, id: impl Into<String>) -> Self {
        match kind {
            EntryKind::Series => CommentTarget::Series(id.into()),
            EntryKind::Film => CommentTarget::Film(id.into()),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            CommentTarget::Series(_) => EntryKind::Series,
            CommentTarget::Film(_) => EntryKind::Film,
        }
    }

    pub fn entry_id(&self) -> &str {
        match self {
            CommentTarget::Series(id) | CommentTarget::Film(id) => id,
        }
    }

    /// Column holding this target's key in the comments table.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            CommentTarget::Series(_) => "series_id",
            CommentTarget::Film(_) => "film_id",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub target: CommentTarget,
    pub user_id: String,
    pub content: String,
    /// Unix seconds, UTC
    pub created_at: i64,
}

/// Result of a delete attempt, decided by the store in the same statement
/// that removes the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentDeletion {
    Deleted,
    NotFound,
    /// The comment exists but belongs to someone else.
    Forbidden,
}

// =============================================================================
// Watch history
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchHistoryUpdate {
    pub user_id: String,
    pub kind: EntryKind,
    pub entry_id: String,
    pub episode_number: Option<u32>,
    pub progress_seconds: u32,
    /// Unix seconds, UTC
    pub last_watched_at: i64,
}
