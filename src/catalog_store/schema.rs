//! SQLite schema for the media catalog.
//!
//! Series and films live in separate tables sharing the same column shape
//! (films keep `episode_count` at 0). Genres hang off both through
//! association tables whose `genre_id` is not a foreign key: an association
//! may outlive the genre it points at and is then skipped during resolution.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

// =============================================================================
// Entries
// =============================================================================

const SERIES_TABLE: Table = Table {
    name: "series",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("synopsis", &SqlType::Text),
        sqlite_column!("thumbnail_url", &SqlType::Text),
        sqlite_column!("thumbnail_file_path", &SqlType::Text),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("release_year", &SqlType::Integer),
        sqlite_column!("status", &SqlType::Text),
        sqlite_column!(
            "episode_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_archived",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_series_rating", "rating"),
        ("idx_series_title", "title"),
    ],
    unique_constraints: &[],
    checks: &[],
};

const FILMS_TABLE: Table = Table {
    name: "films",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("synopsis", &SqlType::Text),
        sqlite_column!("thumbnail_url", &SqlType::Text),
        sqlite_column!("thumbnail_file_path", &SqlType::Text),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("release_year", &SqlType::Integer),
        sqlite_column!("status", &SqlType::Text),
        sqlite_column!(
            "episode_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "is_archived",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_films_rating", "rating"), ("idx_films_title", "title")],
    unique_constraints: &[],
    checks: &[],
};

// =============================================================================
// Genres
// =============================================================================

const GENRES_TABLE: Table = Table {
    name: "genres",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
    checks: &[],
};

const SERIES_FK: ForeignKey = ForeignKey {
    foreign_table: "series",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const FILMS_FK: ForeignKey = ForeignKey {
    foreign_table: "films",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const SERIES_GENRES_TABLE: Table = Table {
    name: "series_genres",
    columns: &[
        sqlite_column!(
            "entry_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SERIES_FK)
        ),
        sqlite_column!("genre_id", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_series_genres_entry", "entry_id")],
    unique_constraints: &[&["entry_id", "genre_id"]],
    checks: &[],
};

const FILM_GENRES_TABLE: Table = Table {
    name: "film_genres",
    columns: &[
        sqlite_column!(
            "entry_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&FILMS_FK)
        ),
        sqlite_column!("genre_id", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_film_genres_entry", "entry_id")],
    unique_constraints: &[&["entry_id", "genre_id"]],
    checks: &[],
};

// =============================================================================
// Episodes and playback links
// =============================================================================

const EPISODES_FK: ForeignKey = ForeignKey {
    foreign_table: "episodes",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const EPISODES_TABLE: Table = Table {
    name: "episodes",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "series_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&SERIES_FK)
        ),
        sqlite_column!("episode_number", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text),
        sqlite_column!("duration_minutes", &SqlType::Integer),
        sqlite_column!("season", &SqlType::Integer),
        sqlite_column!("language", &SqlType::Text),
    ],
    indices: &[("idx_episodes_series", "series_id")],
    unique_constraints: &[],
    checks: &[],
};

/// Duplicate (episode, platform) rows are allowed; rowid order is the
/// chronological order used to pick the winner.
const EPISODE_LINKS_TABLE: Table = Table {
    name: "episode_links",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "episode_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&EPISODES_FK)
        ),
        sqlite_column!("platform", &SqlType::Text, non_null = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_episode_links_episode", "episode_id")],
    unique_constraints: &[],
    checks: &[],
};

const FILM_LINKS_TABLE: Table = Table {
    name: "film_links",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "film_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&FILMS_FK)
        ),
        sqlite_column!("platform", &SqlType::Text, non_null = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("quality", &SqlType::Text),
        sqlite_column!("language", &SqlType::Text),
    ],
    indices: &[("idx_film_links_film", "film_id")],
    unique_constraints: &[],
    checks: &[],
};

// =============================================================================
// Users, discussion, history
// =============================================================================

const PROFILES_TABLE: Table = Table {
    name: "profiles",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("username", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
    checks: &[],
};

const COMMENTS_TABLE: Table = Table {
    name: "comments",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("series_id", &SqlType::Text, foreign_key = Some(&SERIES_FK)),
        sqlite_column!("film_id", &SqlType::Text, foreign_key = Some(&FILMS_FK)),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_comments_series", "series_id"),
        ("idx_comments_film", "film_id"),
    ],
    unique_constraints: &[],
    checks: &["(series_id IS NULL) <> (film_id IS NULL)"],
};

/// `episode_number` is 0 for entries watched as a whole (films), so that
/// the unique key never contains a NULL.
const WATCH_HISTORY_TABLE: Table = Table {
    name: "watch_history",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("entry_kind", &SqlType::Text, non_null = true),
        sqlite_column!("entry_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "episode_number",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("progress_seconds", &SqlType::Integer, non_null = true),
        sqlite_column!("last_watched_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_watch_history_user", "user_id")],
    unique_constraints: &[&["user_id", "entry_kind", "entry_id", "episode_number"]],
    checks: &[],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SERIES_TABLE,
        FILMS_TABLE,
        GENRES_TABLE,
        SERIES_GENRES_TABLE,
        FILM_GENRES_TABLE,
        EPISODES_TABLE,
        EPISODE_LINKS_TABLE,
        FILM_LINKS_TABLE,
        PROFILES_TABLE,
        COMMENTS_TABLE,
        WATCH_HISTORY_TABLE,
    ],
    migration: None,
}];
