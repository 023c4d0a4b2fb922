use super::slot::{Applied, GuardedSlot, SlotSnapshot};
use crate::catalog_store::{CatalogBackend, CatalogEntry, EntryKind};
use crate::error::CatalogResult;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Case-insensitive substring filter over title and description. A blank
/// query keeps everything.
pub fn filter_by_text(items: &[CatalogEntry], query: &str) -> Vec<CatalogEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|e| {
            e.title.to_lowercase().contains(&needle)
                || e.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Alphabetical film listing with a local text filter.
pub struct FilmLibrary {
    backend: Arc<dyn CatalogBackend>,
    slot: GuardedSlot<Vec<CatalogEntry>>,
    query: RwLock<String>,
}

impl FilmLibrary {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            slot: GuardedSlot::new(),
            query: RwLock::new(String::new()),
        }
    }

    pub async fn load(&self) -> CatalogResult<Applied> {
        let ticket = self.slot.begin().await;
        let result = self
            .backend
            .list_entries_by_title(EntryKind::Film)
            .await
            .map_err(Into::into);
        self.slot.apply(ticket, result).await
    }

    pub async fn snapshot(&self) -> SlotSnapshot<Vec<CatalogEntry>> {
        self.slot.snapshot().await
    }

    /// Filtering is local; nothing is re-fetched.
    pub async fn set_query(&self, query: &str) {
        *self.query.write().await = query.to_string();
    }

    pub async fn visible(&self) -> Vec<CatalogEntry> {
        let Some(films) = self.slot.current().await else {
            return Vec::new();
        };
        let query = self.query.read().await;
        filter_by_text(&films, &query)
    }
}
