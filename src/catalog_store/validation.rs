//! Row parsers: the only place raw SQLite rows turn into catalog models.
//!
//! Shapes that cannot be represented are rejected with a conversion error
//! naming the column; soft problems (blank text, an unknown status, a rating
//! out of range) are normalised to `None`.

use super::models::{
    CatalogEntry, CommentRecord, CommentTarget, EntryKind, EpisodeLink, EpisodeRecord, FilmLink,
    GenreAssociation, LifecycleStatus, MAX_EPISODE_COUNT,
};
use rusqlite::types::Type;
use rusqlite::Row;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

pub(super) const MAX_RATING: f64 = 10.0;

#[derive(Debug, Error)]
pub enum RowShapeError {
    #[error("{column}: expected a non-negative integer, got {value}")]
    Negative { column: &'static str, value: i64 },
    #[error("{column}: value {value} does not fit")]
    Overflow { column: &'static str, value: i64 },
    #[error("{column}: must not be blank")]
    Blank { column: &'static str },
    #[error("comment {id} must reference exactly one of series_id / film_id")]
    AmbiguousCommentTarget { id: String },
}

fn reject(index: usize, ty: Type, err: RowShapeError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(err))
}

/// Optional text with blank values collapsed to `None`.
fn opt_text(row: &Row, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(row
        .get::<_, Option<String>>(index)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn required_text(row: &Row, index: usize, column: &'static str) -> rusqlite::Result<String> {
    let value: String = row.get(index)?;
    if value.trim().is_empty() {
        return Err(reject(index, Type::Text, RowShapeError::Blank { column }));
    }
    Ok(value)
}

fn to_u32(index: usize, column: &'static str, value: i64) -> rusqlite::Result<u32> {
    if value < 0 {
        return Err(reject(
            index,
            Type::Integer,
            RowShapeError::Negative { column, value },
        ));
    }
    u32::try_from(value)
        .map_err(|_| reject(index, Type::Integer, RowShapeError::Overflow { column, value }))
}

fn opt_u32(row: &Row, index: usize, column: &'static str) -> rusqlite::Result<Option<u32>> {
    row.get::<_, Option<i64>>(index)?
        .map(|v| to_u32(index, column, v))
        .transpose()
}

fn required_u32(row: &Row, index: usize, column: &'static str) -> rusqlite::Result<u32> {
    to_u32(index, column, row.get(index)?)
}

/// Column list matching `parse_entry_row`, shared by every entry query.
pub(super) const ENTRY_COLUMNS: &str = "id, title, description, synopsis, thumbnail_url, \
     thumbnail_file_path, rating, release_year, status, episode_count, is_archived";

pub(super) fn parse_entry_row(kind: EntryKind, row: &Row) -> rusqlite::Result<CatalogEntry> {
    let id = required_text(row, 0, "id")?;

    let rating = row.get::<_, Option<f64>>(6)?.and_then(|r| {
        if r.is_finite() && (0.0..=MAX_RATING).contains(&r) {
            Some(r)
        } else {
            warn!("Ignoring out of range rating {} on {} {}", r, kind, id);
            None
        }
    });

    let status = opt_text(row, 8)?.and_then(|s| {
        let parsed = LifecycleStatus::from_db_str(&s);
        if parsed.is_none() {
            warn!("Ignoring unknown status {:?} on {} {}", s, kind, id);
        }
        parsed
    });

    let episode_count = match kind {
        EntryKind::Series => {
            let declared = required_u32(row, 9, "episode_count")?;
            if declared > MAX_EPISODE_COUNT {
                warn!(
                    "Capping episode count {} on {} {} to {}",
                    declared, kind, id, MAX_EPISODE_COUNT
                );
            }
            declared.min(MAX_EPISODE_COUNT)
        }
        EntryKind::Film => 0,
    };

    Ok(CatalogEntry {
        title: required_text(row, 1, "title")?,
        description: opt_text(row, 2)?,
        synopsis: opt_text(row, 3)?,
        thumbnail_url: opt_text(row, 4)?,
        thumbnail_file_path: opt_text(row, 5)?,
        rating,
        release_year: row.get(7)?,
        status,
        episode_count,
        is_archived: row.get::<_, i64>(10)? != 0,
        genres: BTreeSet::new(),
        kind,
        id,
    })
}

/// (id, series_id, episode_number, title, duration_minutes, season, language)
pub(super) fn parse_episode_row(row: &Row) -> rusqlite::Result<EpisodeRecord> {
    Ok(EpisodeRecord {
        id: required_text(row, 0, "id")?,
        series_id: row.get(1)?,
        episode_number: required_u32(row, 2, "episode_number")?,
        title: opt_text(row, 3)?,
        duration_minutes: opt_u32(row, 4, "duration_minutes")?,
        season: opt_u32(row, 5, "season")?,
        language: opt_text(row, 6)?,
        links: Vec::new(),
    })
}

/// (platform, url)
pub(super) fn parse_episode_link_row(row: &Row) -> rusqlite::Result<EpisodeLink> {
    Ok(EpisodeLink {
        platform: required_text(row, 0, "platform")?,
        url: required_text(row, 1, "url")?,
    })
}

/// (id, platform, url, quality, language)
pub(super) fn parse_film_link_row(row: &Row) -> rusqlite::Result<FilmLink> {
    Ok(FilmLink {
        id: row.get(0)?,
        platform: required_text(row, 1, "platform")?,
        url: required_text(row, 2, "url")?,
        quality: opt_text(row, 3)?,
        language: opt_text(row, 4)?,
    })
}

/// (genre_id, name)
pub(super) fn parse_genre_row(row: &Row) -> rusqlite::Result<GenreAssociation> {
    Ok(GenreAssociation {
        genre_id: row.get(0)?,
        name: opt_text(row, 1)?,
    })
}

/// (id, user_id, series_id, film_id, content, created_at)
pub(super) fn parse_comment_row(row: &Row) -> rusqlite::Result<CommentRecord> {
    let id: String = row.get(0)?;
    let series_id: Option<String> = row.get(2)?;
    let film_id: Option<String> = row.get(3)?;
    let target = match (series_id, film_id) {
        (Some(series), None) => CommentTarget::Series(series),
        (None, Some(film)) => CommentTarget::Film(film),
        _ => {
            return Err(reject(
                2,
                Type::Text,
                RowShapeError::AmbiguousCommentTarget { id },
            ))
        }
    };
    Ok(CommentRecord {
        user_id: row.get(1)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
        target,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn query<T>(sql: &str, f: impl FnOnce(&Row) -> rusqlite::Result<T>) -> rusqlite::Result<T> {
        let conn = Connection::open_in_memory().unwrap();
        conn.query_row(sql, [], f)
    }

    #[test]
    fn test_entry_row_normalises_soft_problems() {
        let entry = query(
            "SELECT 's1', 'Title', '  ', NULL, '', NULL, 42.0, 2020, 'Hiatus', 12, 0",
            |r| parse_entry_row(EntryKind::Series, r),
        )
        .unwrap();

        assert_eq!(entry.description, None);
        assert_eq!(entry.thumbnail_url, None);
        assert_eq!(entry.rating, None);
        assert_eq!(entry.status, None);
        assert_eq!(entry.episode_count, 12);
        assert!(!entry.is_archived);
    }

    #[test]
    fn test_film_row_ignores_episode_count() {
        let entry = query(
            "SELECT 'f1', 'Film', NULL, NULL, NULL, NULL, 7.5, NULL, 'completed', 99, 1",
            |r| parse_entry_row(EntryKind::Film, r),
        )
        .unwrap();

        assert_eq!(entry.episode_count, 0);
        assert_eq!(entry.rating, Some(7.5));
        assert_eq!(entry.status, Some(LifecycleStatus::Completed));
        assert!(entry.is_archived);
    }

    #[test]
    fn test_entry_row_caps_episode_count() {
        let entry = query(
            "SELECT 's1', 'Title', NULL, NULL, NULL, NULL, NULL, NULL, NULL, 4000000000, 0",
            |r| parse_entry_row(EntryKind::Series, r),
        )
        .unwrap();
        assert_eq!(entry.episode_count, MAX_EPISODE_COUNT);
    }

    #[test]
    fn test_entry_row_rejects_blank_title() {
        let result = query(
            "SELECT 's1', '   ', NULL, NULL, NULL, NULL, NULL, NULL, NULL, 1, 0",
            |r| parse_entry_row(EntryKind::Series, r),
        );
        assert!(result.unwrap_err().to_string().contains("title"));
    }

    #[test]
    fn test_episode_row_rejects_negative_number() {
        let result = query(
            "SELECT 'e1', 's1', -3, NULL, NULL, NULL, NULL",
            parse_episode_row,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_comment_row_requires_single_target() {
        let result = query(
            "SELECT 'c1', 'u1', 's1', 'f1', 'hi', 0",
            parse_comment_row,
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("exactly one of series_id / film_id"));

        let comment = query(
            "SELECT 'c1', 'u1', NULL, 'f1', 'hi', 10",
            parse_comment_row,
        )
        .unwrap();
        assert_eq!(comment.target, CommentTarget::Film("f1".to_string()));
        assert_eq!(comment.created_at, 10);
    }
}
