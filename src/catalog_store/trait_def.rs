//! Backend contract consumed by the view-model layer.

use super::models::{
    CatalogEntry, CommentDeletion, CommentRecord, CommentTarget, EntryKind, EpisodeLink,
    EpisodeRecord, FilmLink, GenreAssociation, WatchHistoryUpdate,
};
use anyhow::Result;
use async_trait::async_trait;

/// Relational query surface behind every catalog view.
///
/// Every read excludes archived entries. Each call completes atomically from
/// the caller's point of view; there is no streaming of partial rows.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    // =========================================================================
    // Entries
    // =========================================================================

    /// Entries of `kind` ordered by rating descending, then id ascending.
    /// Entries without a rating come last.
    async fn list_entries(&self, kind: EntryKind, limit: Option<usize>)
        -> Result<Vec<CatalogEntry>>;

    /// A single non-archived entry, or `None`.
    async fn get_entry(&self, kind: EntryKind, id: &str) -> Result<Option<CatalogEntry>>;

    /// Same ordering as `list_entries`, skipping `exclude_id`.
    async fn list_related(
        &self,
        kind: EntryKind,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>>;

    /// Every entry of `kind`, ordered by title ascending.
    async fn list_entries_by_title(&self, kind: EntryKind) -> Result<Vec<CatalogEntry>>;

    /// Case-insensitive substring match on titles, same ordering as `list_entries`.
    async fn search_entries(
        &self,
        kind: EntryKind,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>>;

    // =========================================================================
    // Episodes, links, genres
    // =========================================================================

    /// Episodes of a series ordered by episode number, links embedded in
    /// insertion order.
    async fn list_episodes(&self, series_id: &str) -> Result<Vec<EpisodeRecord>>;

    /// Links of a single episode, in insertion order.
    async fn list_episode_links(&self, episode_id: &str) -> Result<Vec<EpisodeLink>>;

    /// Film links ordered by language, then platform, ascending.
    async fn list_film_links(&self, film_id: &str) -> Result<Vec<FilmLink>>;

    async fn list_genres(&self, kind: EntryKind, entry_id: &str) -> Result<Vec<GenreAssociation>>;

    // =========================================================================
    // Discussion
    // =========================================================================

    /// Comments for `target`, newest first.
    async fn list_comments(&self, target: &CommentTarget) -> Result<Vec<CommentRecord>>;

    async fn get_profile_name(&self, user_id: &str) -> Result<Option<String>>;

    async fn insert_comment(
        &self,
        target: &CommentTarget,
        author_id: &str,
        content: &str,
    ) -> Result<CommentRecord>;

    /// Deletes the comment only if `requesting_user` wrote it.
    async fn delete_comment(
        &self,
        comment_id: &str,
        requesting_user: &str,
    ) -> Result<CommentDeletion>;

    // =========================================================================
    // Watch history
    // =========================================================================

    /// Inserts or replaces the row keyed by (user, entry, episode).
    async fn upsert_watch_history(&self, update: &WatchHistoryUpdate) -> Result<()>;
}
