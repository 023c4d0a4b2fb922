//! SQLite-backed catalog store.

use super::models::{
    CatalogEntry, CommentDeletion, CommentRecord, CommentTarget, EntryKind, EpisodeLink,
    EpisodeRecord, FilmLink, GenreAssociation, WatchHistoryUpdate,
};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogBackend;
use super::validation::{
    parse_comment_row, parse_entry_row, parse_episode_link_row, parse_episode_row,
    parse_film_link_row, parse_genre_row, ENTRY_COLUMNS,
};
use crate::sqlite_persistence::ensure_schema;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const DEFAULT_READ_POOL_SIZE: usize = 4;

/// Rating descending with unrated entries last, then id ascending.
const RATING_ORDER: &str = "rating IS NULL, rating DESC, id ASC";

#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

impl SqliteCatalogStore {
    /// Opens (creating if needed) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_read_pool_size(db_path, DEFAULT_READ_POOL_SIZE)
    }

    pub fn with_read_pool_size<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database at {:?}", db_path))?;

        ensure_schema(&mut write_conn, CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let series_count: i64 =
            write_conn.query_row("SELECT COUNT(*) FROM series", [], |r| r.get(0))?;
        let film_count: i64 = write_conn.query_row("SELECT COUNT(*) FROM films", [], |r| r.get(0))?;
        let comment_count: i64 =
            write_conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
        info!(
            "Opened catalog: {} series, {} films, {} comments",
            series_count, film_count, comment_count
        );

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
        conn.lock()
            .map_err(|_| anyhow!("Catalog connection mutex poisoned"))
    }

    /// Runs `f` against the next pooled read connection.
    fn with_read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let pooled = self.read_conn();
        let conn = Self::lock(&pooled)?;
        f(&conn)
    }

    fn with_write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = Self::lock(&self.write_conn)?;
        f(&conn)
    }

    // =========================================================================
    // Entry queries
    // =========================================================================

    fn query_entries(
        conn: &Connection,
        kind: EntryKind,
        filter: &str,
        order: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CatalogEntry>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_archived = 0{} ORDER BY {}",
            ENTRY_COLUMNS,
            kind.table(),
            filter,
            order
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let entries = stmt
            .query_map(params, |row| parse_entry_row(kind, row))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Malformed row in {}", kind.table()))?;
        Ok(entries)
    }

    fn links_for_series(conn: &Connection, series_id: &str) -> Result<HashMap<String, Vec<EpisodeLink>>> {
        let mut stmt = conn.prepare_cached(
            "SELECT l.episode_id, l.platform, l.url FROM episode_links l
             JOIN episodes e ON e.id = l.episode_id
             WHERE e.series_id = ?1 ORDER BY l.id ASC",
        )?;
        let mut rows = stmt.query(params![series_id])?;
        let mut links: HashMap<String, Vec<EpisodeLink>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let episode_id: String = row.get(0)?;
            let link = EpisodeLink {
                platform: row.get(1)?,
                url: row.get(2)?,
            };
            links.entry(episode_id).or_default().push(link);
        }
        Ok(links)
    }

    fn get_comment_inner(conn: &Connection, comment_id: &str) -> Result<Option<CommentRecord>> {
        match conn.query_row(
            "SELECT id, user_id, series_id, film_id, content, created_at FROM comments WHERE id = ?1",
            params![comment_id],
            parse_comment_row,
        ) {
            Ok(comment) => Ok(Some(comment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(substring: &str) -> String {
    let mut pattern = String::with_capacity(substring.len() + 2);
    pattern.push('%');
    for c in substring.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // sqlite treats a negative LIMIT as "no limit"
    limit.map(|l| l as i64).unwrap_or(-1)
}

#[async_trait]
impl CatalogBackend for SqliteCatalogStore {
    async fn list_entries(
        &self,
        kind: EntryKind,
        limit: Option<usize>,
    ) -> Result<Vec<CatalogEntry>> {
        self.with_read(|conn| {
            Self::query_entries(
                conn,
                kind,
                "",
                &format!("{} LIMIT ?1", RATING_ORDER),
                &[&sql_limit(limit)],
            )
        })
    }

    async fn get_entry(&self, kind: EntryKind, id: &str) -> Result<Option<CatalogEntry>> {
        self.with_read(|conn| {
            let mut entries = Self::query_entries(conn, kind, " AND id = ?1", "id", &[&id])?;
            Ok(entries.pop())
        })
    }

    async fn list_related(
        &self,
        kind: EntryKind,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        self.with_read(|conn| {
            Self::query_entries(
                conn,
                kind,
                " AND id <> ?1",
                &format!("{} LIMIT ?2", RATING_ORDER),
                &[&exclude_id, &sql_limit(Some(limit))],
            )
        })
    }

    async fn list_entries_by_title(&self, kind: EntryKind) -> Result<Vec<CatalogEntry>> {
        self.with_read(|conn| Self::query_entries(conn, kind, "", "title ASC, id ASC", &[]))
    }

    async fn search_entries(
        &self,
        kind: EntryKind,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        let pattern = like_pattern(substring);
        debug!("Searching {} for {:?}", kind.table(), pattern);
        self.with_read(|conn| {
            Self::query_entries(
                conn,
                kind,
                " AND title LIKE ?1 ESCAPE '\\'",
                &format!("{} LIMIT ?2", RATING_ORDER),
                &[&pattern, &sql_limit(Some(limit))],
            )
        })
    }

    async fn list_episodes(&self, series_id: &str) -> Result<Vec<EpisodeRecord>> {
        self.with_read(|conn| {
            let mut links = Self::links_for_series(conn, series_id)?;
            let mut stmt = conn.prepare_cached(
                "SELECT id, series_id, episode_number, title, duration_minutes, season, language
                 FROM episodes WHERE series_id = ?1 ORDER BY episode_number ASC, rowid ASC",
            )?;
            let mut episodes = stmt
                .query_map(params![series_id], parse_episode_row)?
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Malformed episode row for series {}", series_id))?;
            for episode in &mut episodes {
                episode.links = links.remove(&episode.id).unwrap_or_default();
            }
            Ok(episodes)
        })
    }

    async fn list_episode_links(&self, episode_id: &str) -> Result<Vec<EpisodeLink>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT platform, url FROM episode_links WHERE episode_id = ?1 ORDER BY id ASC",
            )?;
            let links = stmt
                .query_map(params![episode_id], parse_episode_link_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }

    async fn list_film_links(&self, film_id: &str) -> Result<Vec<FilmLink>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, platform, url, quality, language FROM film_links
                 WHERE film_id = ?1 ORDER BY language ASC, platform ASC",
            )?;
            let links = stmt
                .query_map(params![film_id], parse_film_link_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }

    async fn list_genres(&self, kind: EntryKind, entry_id: &str) -> Result<Vec<GenreAssociation>> {
        self.with_read(|conn| {
            let sql = format!(
                "SELECT a.genre_id, g.name FROM {} a LEFT JOIN genres g ON g.id = a.genre_id
                 WHERE a.entry_id = ?1 ORDER BY a.rowid ASC",
                kind.genre_table()
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let genres = stmt
                .query_map(params![entry_id], parse_genre_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(genres)
        })
    }

    async fn list_comments(&self, target: &CommentTarget) -> Result<Vec<CommentRecord>> {
        self.with_read(|conn| {
            let sql = format!(
                "SELECT id, user_id, series_id, film_id, content, created_at FROM comments
                 WHERE {} = ?1 ORDER BY created_at DESC, rowid DESC",
                target.column()
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let comments = stmt
                .query_map(params![target.entry_id()], parse_comment_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(comments)
        })
    }

    async fn get_profile_name(&self, user_id: &str) -> Result<Option<String>> {
        self.with_read(|conn| {
            match conn.query_row(
                "SELECT username FROM profiles WHERE user_id = ?1",
                params![user_id],
                |r| r.get::<_, Option<String>>(0),
            ) {
                Ok(name) => Ok(name.filter(|n| !n.trim().is_empty())),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    async fn insert_comment(
        &self,
        target: &CommentTarget,
        author_id: &str,
        content: &str,
    ) -> Result<CommentRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();
        self.with_write(|conn| {
            let sql = format!(
                "INSERT INTO comments (id, user_id, {}, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                target.column()
            );
            conn.execute(
                &sql,
                params![id, author_id, target.entry_id(), content, created_at],
            )
            .with_context(|| format!("Failed to insert comment on {:?}", target))?;
            Ok(())
        })?;
        debug!("Inserted comment {} by {} on {:?}", id, author_id, target);

        Ok(CommentRecord {
            id,
            target: target.clone(),
            user_id: author_id.to_string(),
            content: content.to_string(),
            created_at,
        })
    }

    async fn delete_comment(
        &self,
        comment_id: &str,
        requesting_user: &str,
    ) -> Result<CommentDeletion> {
        self.with_write(|conn| {
            let deleted = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
                params![comment_id, requesting_user],
            )?;
            if deleted > 0 {
                return Ok(CommentDeletion::Deleted);
            }
            match Self::get_comment_inner(conn, comment_id)? {
                Some(_) => Ok(CommentDeletion::Forbidden),
                None => Ok(CommentDeletion::NotFound),
            }
        })
    }

    async fn upsert_watch_history(&self, update: &WatchHistoryUpdate) -> Result<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO watch_history
                    (user_id, entry_kind, entry_id, episode_number, progress_seconds, last_watched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id, entry_kind, entry_id, episode_number) DO UPDATE SET
                    progress_seconds = excluded.progress_seconds,
                    last_watched_at = excluded.last_watched_at",
                params![
                    update.user_id,
                    update.kind.to_db_str(),
                    update.entry_id,
                    update.episode_number.unwrap_or(0),
                    update.progress_seconds,
                    update.last_watched_at
                ],
            )?;
            Ok(())
        })
    }
}
