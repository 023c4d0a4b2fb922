//! Test fixture creation for the catalog database
//!
//! The store only writes comments and watch history, so catalog rows are
//! inserted with direct SQL.

use super::backend::ScriptedBackend;
use super::constants::*;
use anidost_catalog::catalog_store::SqliteCatalogStore;
use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a temporary catalog with 4 series, 3 films, genres, episodes,
/// links, profiles and two comments.
/// Returns (temp_dir, catalog_db_path)
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");

    // Initialize the store (creates schema)
    let _store = SqliteCatalogStore::new(&catalog_db_path)?;

    let conn = Connection::open(&catalog_db_path)?;

    // Series
    let series: [(&str, &str, Option<f64>, u32, bool); 4] = [
        (SERIES_NARUTO_ID, SERIES_NARUTO_TITLE, Some(8.5), SERIES_NARUTO_EPISODES, false),
        (SERIES_BLEACH_ID, SERIES_BLEACH_TITLE, Some(8.0), 2, false),
        (SERIES_MUSHISHI_ID, "Mushishi", Some(9.0), 1, false),
        (SERIES_ARCHIVED_ID, "Naruto Lost Arc", Some(9.9), 1, true),
    ];
    for (id, title, rating, episode_count, archived) in series {
        conn.execute(
            "INSERT INTO series (id, title, description, rating, status, episode_count, is_archived)
             VALUES (?1, ?2, ?3, ?4, 'ongoing', ?5, ?6)",
            params![id, title, format!("About {}", title), rating, episode_count, archived],
        )?;
    }

    // Films
    let films: [(&str, &str, Option<f64>, bool); 3] = [
        (FILM_SPIRITED_ID, "Spirited Away", Some(9.3), false),
        (FILM_AKIRA_ID, "Akira", Some(8.1), false),
        (FILM_ARCHIVED_ID, "Lost Reel", Some(9.8), true),
    ];
    for (id, title, rating, archived) in films {
        conn.execute(
            "INSERT INTO films (id, title, synopsis, rating, is_archived) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, title, format!("{} synopsis", title), rating, archived],
        )?;
    }

    // Genres. "g-missing" is referenced but has no row.
    conn.execute_batch(
        "INSERT INTO genres (id, name) VALUES
            ('g-action', 'Action'), ('g-adventure', 'Adventure'),
            ('g-drama', 'Drama'), ('g-super', 'Supernatural'), ('g-fantasy', 'Fantasy');",
    )?;
    let series_genres = [
        (SERIES_NARUTO_ID, "g-action"),
        (SERIES_NARUTO_ID, "g-adventure"),
        (SERIES_NARUTO_ID, "g-missing"),
        (SERIES_BLEACH_ID, "g-action"),
        (SERIES_BLEACH_ID, "g-super"),
        (SERIES_MUSHISHI_ID, "g-drama"),
        (SERIES_ARCHIVED_ID, "g-action"),
    ];
    for (entry_id, genre_id) in series_genres {
        conn.execute(
            "INSERT INTO series_genres (entry_id, genre_id) VALUES (?1, ?2)",
            [entry_id, genre_id],
        )?;
    }
    conn.execute(
        "INSERT INTO film_genres (entry_id, genre_id) VALUES (?1, 'g-fantasy')",
        [FILM_SPIRITED_ID],
    )?;

    // Naruto has episodes 1 and 2 stored; 3 is declared but missing.
    conn.execute(
        "INSERT INTO episodes (id, series_id, episode_number, title, duration_minutes, season, language)
         VALUES (?1, ?2, 1, 'Enter: Naruto Uzumaki!', 23, 1, 'Japanese')",
        [NARUTO_EP1_ID, SERIES_NARUTO_ID],
    )?;
    conn.execute(
        "INSERT INTO episodes (id, series_id, episode_number, season, language)
         VALUES (?1, ?2, 2, 2, 'English')",
        [NARUTO_EP2_ID, SERIES_NARUTO_ID],
    )?;
    for (episode_id, platform, url) in [
        (NARUTO_EP1_ID, STREAMER_X, STREAMER_X_OLD_URL),
        (NARUTO_EP1_ID, "Crunchy", "https://crunchy.example/naruto/1"),
        (NARUTO_EP1_ID, STREAMER_X, STREAMER_X_NEW_URL),
        (NARUTO_EP2_ID, "Crunchy", "https://crunchy.example/naruto/2"),
    ] {
        conn.execute(
            "INSERT INTO episode_links (episode_id, platform, url) VALUES (?1, ?2, ?3)",
            [episode_id, platform, url],
        )?;
    }

    // Spirited Away: one untagged link, one Japanese
    conn.execute_batch(&format!(
        "INSERT INTO film_links (id, film_id, platform, url, quality, language) VALUES
            ('fl-1', '{id}', 'Netflix', 'https://netflix.example/spirited', '1080p', NULL),
            ('fl-2', '{id}', 'Crunchy', 'https://crunchy.example/spirited', '720p', 'Japanese');",
        id = FILM_SPIRITED_ID
    ))?;

    // Profiles and comments
    conn.execute(
        "INSERT INTO profiles (user_id, username) VALUES (?1, ?2)",
        [USER_ALICE, USER_ALICE_NAME],
    )?;
    conn.execute(
        "INSERT INTO comments (id, user_id, series_id, content, created_at)
         VALUES (?1, ?2, ?3, 'Believe it!', 1700000000)",
        [COMMENT_ALICE_ID, USER_ALICE, SERIES_NARUTO_ID],
    )?;
    conn.execute(
        "INSERT INTO comments (id, user_id, series_id, content, created_at)
         VALUES (?1, ?2, ?3, 'Filler arc is long', 1700000100)",
        [COMMENT_BOB_ID, USER_BOB, SERIES_NARUTO_ID],
    )?;

    Ok((dir, catalog_db_path))
}

/// The fixture catalog opened through a [`ScriptedBackend`].
pub struct TestCatalog {
    pub db_path: PathBuf,
    pub backend: Arc<ScriptedBackend>,
    _dir: TempDir,
}

impl TestCatalog {
    pub fn new() -> Self {
        let (dir, db_path) = create_test_catalog().expect("Failed to create test catalog");
        let store = SqliteCatalogStore::new(&db_path).expect("Failed to open test catalog");
        Self {
            db_path,
            backend: Arc::new(ScriptedBackend::new(store)),
            _dir: dir,
        }
    }

    /// Raw connection for assertions on stored rows.
    #[allow(dead_code)]
    pub fn connection(&self) -> Connection {
        Connection::open(&self.db_path).expect("Failed to open test catalog")
    }
}
