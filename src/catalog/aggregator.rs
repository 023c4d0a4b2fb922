use crate::catalog_store::{CatalogBackend, CatalogEntry, EntryKind};
use crate::error::CatalogResult;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on genre lookups in flight at once.
const GENRE_LOOKUP_CONCURRENCY: usize = 16;

/// Fetches entry slices and joins each entry with its genre names.
#[derive(Clone)]
pub struct CatalogAggregator {
    backend: Arc<dyn CatalogBackend>,
}

impl CatalogAggregator {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn CatalogBackend> {
        &self.backend
    }

    /// Top entries of `kind` by rating, each with its genres resolved.
    ///
    /// A failed genre lookup leaves that entry with no genres; only the
    /// entry query itself can fail the call.
    pub async fn list(&self, kind: EntryKind, limit: Option<usize>) -> CatalogResult<Vec<CatalogEntry>> {
        let entries = self.backend.list_entries(kind, limit).await?;
        Ok(self.finish(entries).await)
    }

    /// Entries of the same kind as `exclude_id`, minus that entry.
    pub async fn related(
        &self,
        kind: EntryKind,
        exclude_id: &str,
        limit: usize,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        let mut entries = self.backend.list_related(kind, exclude_id, limit).await?;
        entries.retain(|e| e.id != exclude_id);
        Ok(self.finish(entries).await)
    }

    async fn finish(&self, mut entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
        let before = entries.len();
        entries.retain(|e| !e.is_archived);
        if entries.len() != before {
            debug!("Dropped {} archived entries", before - entries.len());
        }
        sort_by_rating(&mut entries);
        self.attach_genres(&mut entries).await;
        entries
    }

    /// Resolves genres for every entry concurrently, preserving order.
    pub async fn attach_genres(&self, entries: &mut [CatalogEntry]) {
        let keys: Vec<(EntryKind, String)> =
            entries.iter().map(|e| (e.kind, e.id.clone())).collect();
        let resolved: Vec<BTreeSet<String>> = stream::iter(keys)
            .map(|(kind, id)| async move { self.resolve_genres(kind, &id).await })
            .buffered(GENRE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        for (entry, genres) in entries.iter_mut().zip(resolved) {
            entry.genres = genres;
        }
    }

    /// Genre names for one entry. Associations without a name are skipped
    /// and a failed lookup yields an empty set.
    pub async fn resolve_genres(&self, kind: EntryKind, entry_id: &str) -> BTreeSet<String> {
        match self.backend.list_genres(kind, entry_id).await {
            Ok(associations) => associations.into_iter().filter_map(|a| a.name).collect(),
            Err(err) => {
                warn!("Genre lookup failed for {} {}: {:#}", kind, entry_id, err);
                BTreeSet::new()
            }
        }
    }
}

/// Rating descending, unrated last, ties by id ascending.
pub fn sort_by_rating(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id)));
}
