//! A [`CatalogBackend`] wrapper that lets tests script latency and failures.
#![allow(dead_code)]

use anidost_catalog::catalog_store::{
    CatalogBackend, CatalogEntry, CommentDeletion, CommentRecord, CommentTarget, EntryKind,
    EpisodeLink, EpisodeRecord, FilmLink, GenreAssociation, SqliteCatalogStore,
    WatchHistoryUpdate,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendCall {
    pub op: &'static str,
    pub key: String,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    /// Latency per search substring
    search_delays: HashMap<String, Duration>,
    /// Latency per entry id, applied to `get_entry`
    entry_delays: HashMap<String, Duration>,
    failing_entries: HashSet<String>,
    failing_related: HashSet<String>,
    failing_genres: HashSet<String>,
    failing_profiles: HashSet<String>,
    failing_lists: HashSet<EntryKind>,
    fail_inserts: bool,
    insert_delay: Option<Duration>,
}

pub struct ScriptedBackend {
    store: SqliteCatalogStore,
    script: Mutex<Script>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
    pub fn new(store: SqliteCatalogStore) -> Self {
        Self {
            store,
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delay_search(&self, substring: &str, delay: Duration) {
        let mut script = self.script.lock().unwrap();
        script.search_delays.insert(substring.to_string(), delay);
    }

    pub fn delay_entry(&self, id: &str, delay: Duration) {
        let mut script = self.script.lock().unwrap();
        script.entry_delays.insert(id.to_string(), delay);
    }

    pub fn fail_entry_for(&self, id: &str) {
        let mut script = self.script.lock().unwrap();
        script.failing_entries.insert(id.to_string());
    }

    pub fn fail_related_for(&self, id: &str) {
        let mut script = self.script.lock().unwrap();
        script.failing_related.insert(id.to_string());
    }

    pub fn fail_genres_for(&self, entry_id: &str) {
        let mut script = self.script.lock().unwrap();
        script.failing_genres.insert(entry_id.to_string());
    }

    pub fn fail_profile_for(&self, user_id: &str) {
        let mut script = self.script.lock().unwrap();
        script.failing_profiles.insert(user_id.to_string());
    }

    pub fn fail_lists(&self, kind: EntryKind, failing: bool) {
        let mut script = self.script.lock().unwrap();
        if failing {
            script.failing_lists.insert(kind);
        } else {
            script.failing_lists.remove(&kind);
        }
    }

    pub fn fail_inserts(&self, failing: bool) {
        self.script.lock().unwrap().fail_inserts = failing;
    }

    pub fn delay_inserts(&self, delay: Duration) {
        self.script.lock().unwrap().insert_delay = Some(delay);
    }

    pub fn calls(&self, op: &str) -> Vec<BackendCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.op == op)
            .cloned()
            .collect()
    }

    fn record(&self, op: &'static str, key: impl Into<String>) {
        self.calls.lock().unwrap().push(BackendCall {
            op,
            key: key.into(),
            at: Instant::now(),
        });
    }

    async fn pause(&self, delay: Option<Duration>) {
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }

    fn list_fails(&self, kind: EntryKind) -> bool {
        self.script.lock().unwrap().failing_lists.contains(&kind)
    }
}

#[async_trait]
impl CatalogBackend for ScriptedBackend {
    async fn list_entries(&self, kind: EntryKind, limit: Option<usize>) -> Result<Vec<CatalogEntry>> {
        self.record("list_entries", kind.to_string());
        if self.list_fails(kind) {
            bail!("scripted failure listing {}", kind);
        }
        self.store.list_entries(kind, limit).await
    }

    async fn get_entry(&self, kind: EntryKind, id: &str) -> Result<Option<CatalogEntry>> {
        self.record("get_entry", id);
        let delay = self.script.lock().unwrap().entry_delays.get(id).copied();
        self.pause(delay).await;
        if self.script.lock().unwrap().failing_entries.contains(id) {
            bail!("scripted failure loading {}", id);
        }
        self.store.get_entry(kind, id).await
    }

    async fn list_related(
        &self,
        kind: EntryKind,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        self.record("list_related", exclude_id);
        if self.script.lock().unwrap().failing_related.contains(exclude_id) {
            bail!("scripted related failure for {}", exclude_id);
        }
        self.store.list_related(kind, exclude_id, limit).await
    }

    async fn list_entries_by_title(&self, kind: EntryKind) -> Result<Vec<CatalogEntry>> {
        self.record("list_entries_by_title", kind.to_string());
        if self.list_fails(kind) {
            bail!("scripted failure listing {}", kind);
        }
        self.store.list_entries_by_title(kind).await
    }

    async fn search_entries(
        &self,
        kind: EntryKind,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<CatalogEntry>> {
        self.record("search_entries", substring);
        if self.list_fails(kind) {
            bail!("scripted failure searching {}", kind);
        }
        let delay = self
            .script
            .lock()
            .unwrap()
            .search_delays
            .get(substring)
            .copied();
        self.pause(delay).await;
        self.store.search_entries(kind, substring, limit).await
    }

    async fn list_episodes(&self, series_id: &str) -> Result<Vec<EpisodeRecord>> {
        self.record("list_episodes", series_id);
        self.store.list_episodes(series_id).await
    }

    async fn list_episode_links(&self, episode_id: &str) -> Result<Vec<EpisodeLink>> {
        self.record("list_episode_links", episode_id);
        self.store.list_episode_links(episode_id).await
    }

    async fn list_film_links(&self, film_id: &str) -> Result<Vec<FilmLink>> {
        self.record("list_film_links", film_id);
        self.store.list_film_links(film_id).await
    }

    async fn list_genres(&self, kind: EntryKind, entry_id: &str) -> Result<Vec<GenreAssociation>> {
        self.record("list_genres", entry_id);
        if self.script.lock().unwrap().failing_genres.contains(entry_id) {
            bail!("scripted genre failure for {}", entry_id);
        }
        self.store.list_genres(kind, entry_id).await
    }

    async fn list_comments(&self, target: &CommentTarget) -> Result<Vec<CommentRecord>> {
        self.record("list_comments", target.entry_id());
        self.store.list_comments(target).await
    }

    async fn get_profile_name(&self, user_id: &str) -> Result<Option<String>> {
        self.record("get_profile_name", user_id);
        if self.script.lock().unwrap().failing_profiles.contains(user_id) {
            bail!("scripted profile failure for {}", user_id);
        }
        self.store.get_profile_name(user_id).await
    }

    async fn insert_comment(
        &self,
        target: &CommentTarget,
        author_id: &str,
        content: &str,
    ) -> Result<CommentRecord> {
        self.record("insert_comment", target.entry_id());
        if self.script.lock().unwrap().fail_inserts {
            bail!("scripted insert failure");
        }
        let delay = self.script.lock().unwrap().insert_delay;
        self.pause(delay).await;
        self.store.insert_comment(target, author_id, content).await
    }

    async fn delete_comment(
        &self,
        comment_id: &str,
        requesting_user: &str,
    ) -> Result<CommentDeletion> {
        self.record("delete_comment", comment_id);
        self.store.delete_comment(comment_id, requesting_user).await
    }

    async fn upsert_watch_history(&self, update: &WatchHistoryUpdate) -> Result<()> {
        self.record("upsert_watch_history", update.entry_id.clone());
        self.store.upsert_watch_history(update).await
    }
}
