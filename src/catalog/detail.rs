//! Entry detail pages.
//!
//! Each view owns a [`GuardedSlot`]: navigating to another entry while a
//! load is still in flight makes the older response stale.

use super::aggregator::CatalogAggregator;
use super::episodes::{EpisodeGrouping, EpisodeRow, EpisodeSelection};
use super::film_links::FilmLinkGroups;
use super::slot::{Applied, GuardedSlot, SlotSnapshot};
use super::watch::record_play;
use crate::catalog_store::{CatalogEntry, EntryKind, FilmLink, WatchHistoryUpdate};
use crate::config::CatalogSettings;
use crate::error::{CatalogError, CatalogResult};
use crate::navigation::SharePayload;
use crate::session::SessionContext;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesDetail {
    pub entry: CatalogEntry,
    pub episodes: EpisodeGrouping,
    pub related: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilmDetail {
    pub entry: CatalogEntry,
    pub links: FilmLinkGroups,
    pub related: Vec<CatalogEntry>,
}

/// Loads an entry by id with its genres, or `NotFound`.
async fn fetch_entry(
    aggregator: &CatalogAggregator,
    kind: EntryKind,
    id: &str,
) -> CatalogResult<CatalogEntry> {
    let (entry, genres) = tokio::join!(
        aggregator.backend().get_entry(kind, id),
        aggregator.resolve_genres(kind, id),
    );
    let mut entry = entry?
        .filter(|e| !e.is_archived)
        .ok_or_else(|| CatalogError::not_found(kind, id))?;
    entry.genres = genres;
    Ok(entry)
}

/// Related entries are secondary content; a failed lookup shows none.
fn related_or_empty(
    kind: EntryKind,
    id: &str,
    related: CatalogResult<Vec<CatalogEntry>>,
) -> Vec<CatalogEntry> {
    related.unwrap_or_else(|err| {
        warn!("Related lookup for {} {} failed: {}", kind, id, err);
        Vec::new()
    })
}

// =============================================================================
// Series
// =============================================================================

pub struct SeriesDetailView {
    aggregator: CatalogAggregator,
    related_limit: usize,
    slot: GuardedSlot<SeriesDetail>,
    selection: RwLock<EpisodeSelection>,
}

impl SeriesDetailView {
    pub fn new(aggregator: CatalogAggregator, settings: &CatalogSettings) -> Self {
        Self {
            aggregator,
            related_limit: settings.related_limit,
            slot: GuardedSlot::new(),
            selection: RwLock::new(EpisodeSelection::default()),
        }
    }

    /// Loads series `id`. On success the episode filter resets to the
    /// grouping's default selection.
    pub async fn load(&self, id: &str) -> CatalogResult<Applied> {
        let ticket = self.slot.begin_for(id).await;
        let result = self.fetch(id).await;
        let default_selection = result
            .as_ref()
            .ok()
            .map(|detail| detail.episodes.default_selection());

        let applied = self.slot.apply(ticket, result).await?;
        if let Some(selection) = default_selection {
            let mut current = self.selection.write().await;
            if self.slot.is_current(ticket) {
                *current = selection;
            }
        }
        Ok(applied)
    }

    async fn fetch(&self, id: &str) -> CatalogResult<SeriesDetail> {
        let backend = self.aggregator.backend();
        let (entry, episodes, related) = tokio::join!(
            fetch_entry(&self.aggregator, EntryKind::Series, id),
            backend.list_episodes(id),
            self.aggregator
                .related(EntryKind::Series, id, self.related_limit),
        );
        let entry = entry?;
        let episodes = EpisodeGrouping::build(&entry, &episodes?);
        Ok(SeriesDetail {
            entry,
            episodes,
            related: related_or_empty(EntryKind::Series, id, related),
        })
    }

    pub async fn snapshot(&self) -> SlotSnapshot<SeriesDetail> {
        self.slot.snapshot().await
    }

    pub async fn selection(&self) -> EpisodeSelection {
        self.selection.read().await.clone()
    }

    pub async fn select_language(&self, language: Option<String>) {
        self.selection.write().await.language = language;
    }

    pub async fn select_season(&self, season: Option<u32>) {
        self.selection.write().await.season = season;
    }

    /// Episode rows passing the current selection.
    pub async fn visible_episodes(&self) -> Vec<EpisodeRow> {
        let Some(detail) = self.slot.current().await else {
            return Vec::new();
        };
        let selection = self.selection().await;
        detail
            .episodes
            .visible(&selection)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn play(
        &self,
        session: &SessionContext,
        episode: Option<u32>,
    ) -> CatalogResult<WatchHistoryUpdate> {
        let detail = self.loaded().await?;
        record_play(
            self.aggregator.backend().as_ref(),
            session,
            EntryKind::Series,
            &detail.entry.id,
            episode,
        )
        .await
    }

    pub async fn share_payload(&self, base_url: &str) -> Option<SharePayload> {
        let detail = self.slot.current().await?;
        Some(SharePayload::for_entry(&detail.entry, base_url))
    }

    async fn loaded(&self) -> CatalogResult<std::sync::Arc<SeriesDetail>> {
        self.slot
            .current()
            .await
            .ok_or_else(|| CatalogError::Validation("series is not loaded".to_string()))
    }
}

// =============================================================================
// Films
// =============================================================================

pub struct FilmDetailView {
    aggregator: CatalogAggregator,
    related_limit: usize,
    slot: GuardedSlot<FilmDetail>,
    language: RwLock<Option<String>>,
}

impl FilmDetailView {
    pub fn new(aggregator: CatalogAggregator, settings: &CatalogSettings) -> Self {
        Self {
            aggregator,
            related_limit: settings.related_limit,
            slot: GuardedSlot::new(),
            language: RwLock::new(None),
        }
    }

    pub async fn load(&self, id: &str) -> CatalogResult<Applied> {
        let ticket = self.slot.begin_for(id).await;
        let result = self.fetch(id).await;
        let default_language = result
            .as_ref()
            .ok()
            .map(|detail| detail.links.default_language().map(str::to_string));

        let applied = self.slot.apply(ticket, result).await?;
        if let Some(language) = default_language {
            let mut current = self.language.write().await;
            if self.slot.is_current(ticket) {
                *current = language;
            }
        }
        Ok(applied)
    }

    async fn fetch(&self, id: &str) -> CatalogResult<FilmDetail> {
        let backend = self.aggregator.backend();
        let (entry, links, related) = tokio::join!(
            fetch_entry(&self.aggregator, EntryKind::Film, id),
            backend.list_film_links(id),
            self.aggregator.related(EntryKind::Film, id, self.related_limit),
        );
        Ok(FilmDetail {
            entry: entry?,
            links: FilmLinkGroups::build(links?),
            related: related_or_empty(EntryKind::Film, id, related),
        })
    }

    pub async fn snapshot(&self) -> SlotSnapshot<FilmDetail> {
        self.slot.snapshot().await
    }

    pub async fn selected_language(&self) -> Option<String> {
        self.language.read().await.clone()
    }

    /// Switches the visible link group. Unknown languages are ignored and
    /// `false` is returned.
    pub async fn select_language(&self, language: &str) -> bool {
        let Some(detail) = self.slot.current().await else {
            return false;
        };
        if !detail.links.contains(language) {
            return false;
        }
        *self.language.write().await = Some(language.to_string());
        true
    }

    pub async fn visible_links(&self) -> Vec<FilmLink> {
        let Some(detail) = self.slot.current().await else {
            return Vec::new();
        };
        match self.selected_language().await {
            Some(language) => detail.links.links_for(&language).to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn play(&self, session: &SessionContext) -> CatalogResult<WatchHistoryUpdate> {
        let detail = self
            .slot
            .current()
            .await
            .ok_or_else(|| CatalogError::Validation("film is not loaded".to_string()))?;
        record_play(
            self.aggregator.backend().as_ref(),
            session,
            EntryKind::Film,
            &detail.entry.id,
            None,
        )
        .await
    }

    pub async fn share_payload(&self, base_url: &str) -> Option<SharePayload> {
        let detail = self.slot.current().await?;
        Some(SharePayload::for_entry(&detail.entry, base_url))
    }
}
