use super::debounce::Debouncer;
use crate::catalog_store::{CatalogBackend, CatalogEntry, EntryKind};
use crate::config::SearchSettings;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// What the search box shows.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchState {
    /// Trimmed text of the latest keystroke.
    pub query: String,
    pub results: Vec<CatalogEntry>,
    pub searching: bool,
    pub error: Option<String>,
    /// Query number whose outcome is on display; 0 before the first one.
    pub revision: u64,
}

/// Debounced title search over non-archived series.
///
/// Each keystroke takes a new generation number; a response is applied only
/// while its generation is still the latest, so a slow early query can never
/// overwrite the results of a later one.
pub struct SearchEngine {
    backend: Arc<dyn CatalogBackend>,
    max_results: usize,
    debouncer: Debouncer,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<SearchState>>,
}

impl SearchEngine {
    pub fn new(backend: Arc<dyn CatalogBackend>, settings: &SearchSettings) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            backend,
            max_results: settings.max_results,
            debouncer: Debouncer::new(settings.debounce),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Feeds the current contents of the search box.
    ///
    /// Blank input clears the results at once and schedules nothing. Anything
    /// else (re)starts the quiet period; the query runs when it elapses.
    /// Returns the query number that `SearchState::revision` will carry once
    /// this input has been answered.
    pub fn on_query_changed(&self, query: &str) -> u64 {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim().to_string();

        if query.is_empty() {
            self.debouncer.cancel();
            self.state.send_modify(|state| {
                *state = SearchState {
                    revision: ticket,
                    ..SearchState::default()
                }
            });
            return ticket;
        }

        self.state.send_modify(|state| state.query = query.clone());

        let job = SearchJob {
            backend: Arc::clone(&self.backend),
            generation: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
            limit: self.max_results,
            ticket,
            query,
        };
        self.debouncer.schedule(job.run());
        ticket
    }

    pub fn clear(&self) {
        self.on_query_changed("");
    }
}

struct SearchJob {
    backend: Arc<dyn CatalogBackend>,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<SearchState>>,
    limit: usize,
    ticket: u64,
    query: String,
}

impl SearchJob {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.ticket
    }

    async fn run(self) {
        let started = self.state.send_if_modified(|state| {
            if !self.is_current() {
                return false;
            }
            state.searching = true;
            true
        });
        if !started {
            return;
        }

        debug!("Searching series for {:?} (query {})", self.query, self.ticket);
        let result = self
            .backend
            .search_entries(EntryKind::Series, &self.query, self.limit)
            .await;

        self.state.send_if_modified(|state| {
            if !self.is_current() {
                debug!(
                    "Discarding stale results for {:?} (query {})",
                    self.query, self.ticket
                );
                return false;
            }
            state.searching = false;
            state.revision = self.ticket;
            match result {
                Ok(mut entries) => {
                    entries.retain(|e| !e.is_archived && e.kind == EntryKind::Series);
                    entries.truncate(self.limit);
                    state.results = entries;
                    state.error = None;
                }
                Err(err) => {
                    warn!("Search for {:?} failed: {:#}", self.query, err);
                    state.error = Some(err.to_string());
                }
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::SqliteCatalogStore;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::sleep;

    fn engine() -> (TempDir, SearchEngine) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        let store = SqliteCatalogStore::new(&path).unwrap();
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "INSERT INTO series (id, title, rating, episode_count) VALUES ('s1', 'Naruto', 8.0, 220);
             INSERT INTO series (id, title, rating, episode_count, is_archived) VALUES ('s2', 'Naruto Hidden', 9.0, 1, 1);
             INSERT INTO films (id, title, rating) VALUES ('f1', 'Naruto the Movie', 7.0);",
        )
        .unwrap();
        let engine = SearchEngine::new(Arc::new(store), &SearchSettings::default());
        (dir, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn test_finds_non_archived_series_only() {
        let (_dir, engine) = engine();
        let ticket = engine.on_query_changed("  naru ");
        assert_eq!(engine.state().query, "naru");

        let mut rx = engine.subscribe();
        let state = rx.wait_for(|s| s.revision == ticket).await.unwrap().clone();
        assert!(!state.searching);
        let ids: Vec<&str> = state.results.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["s1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_without_fetching() {
        let (_dir, engine) = engine();
        engine.on_query_changed("naruto");
        sleep(Duration::from_millis(400)).await;
        assert_eq!(engine.state().results.len(), 1);

        let ticket = engine.on_query_changed("   ");
        let state = engine.state();
        assert!(state.query.is_empty() && state.results.is_empty());
        assert_eq!(state.revision, ticket);

        sleep(Duration::from_millis(400)).await;
        assert!(engine.state().results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_happens_before_quiet_period() {
        let (_dir, engine) = engine();
        engine.on_query_changed("naruto");
        sleep(Duration::from_millis(299)).await;
        assert!(engine.state().results.is_empty());
        assert!(!engine.state().searching);
    }
}
