use super::aggregator::CatalogAggregator;
use super::genre_filter::{filter_by_genre, genre_facet, GenreSelection};
use super::slot::{Applied, GuardedSlot, SlotSnapshot};
use crate::catalog_store::{CatalogEntry, EntryKind};
use crate::config::CatalogSettings;
use crate::error::CatalogResult;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

const SHELF_SIZE: usize = 6;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HomeCatalog {
    pub series: Vec<CatalogEntry>,
    pub films: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HomeShelves {
    pub popular_series: Vec<CatalogEntry>,
    pub trending_series: Vec<CatalogEntry>,
    pub top_series: Vec<CatalogEntry>,
    pub popular_films: Vec<CatalogEntry>,
    pub more_films: Vec<CatalogEntry>,
}

impl HomeShelves {
    pub fn from_catalog(catalog: &HomeCatalog) -> Self {
        Self {
            popular_series: shelf(&catalog.series, 0),
            trending_series: shelf(&catalog.series, 1),
            top_series: shelf(&catalog.series, 2),
            popular_films: shelf(&catalog.films, 0),
            more_films: shelf(&catalog.films, 1),
        }
    }
}

fn shelf(items: &[CatalogEntry], index: usize) -> Vec<CatalogEntry> {
    let start = (index * SHELF_SIZE).min(items.len());
    let end = (start + SHELF_SIZE).min(items.len());
    items[start..end].to_vec()
}

/// Landing page: top series and films, a genre filter, and shelves.
pub struct HomeView {
    aggregator: CatalogAggregator,
    limit: usize,
    slot: GuardedSlot<HomeCatalog>,
    genre: RwLock<GenreSelection>,
}

impl HomeView {
    pub fn new(aggregator: CatalogAggregator, settings: &CatalogSettings) -> Self {
        Self {
            aggregator,
            limit: settings.home_limit,
            slot: GuardedSlot::new(),
            genre: RwLock::new(GenreSelection::All),
        }
    }

    /// Fetches both lists concurrently. A failure in either keeps whatever
    /// was shown before and raises the banner.
    pub async fn load(&self) -> CatalogResult<Applied> {
        let ticket = self.slot.begin().await;
        let (series, films) = tokio::join!(
            self.aggregator.list(EntryKind::Series, Some(self.limit)),
            self.aggregator.list(EntryKind::Film, Some(self.limit)),
        );
        let result = match (series, films) {
            (Ok(series), Ok(films)) => {
                info!("Home loaded {} series, {} films", series.len(), films.len());
                Ok(HomeCatalog { series, films })
            }
            (Err(err), _) | (_, Err(err)) => Err(err),
        };
        self.slot.apply(ticket, result).await
    }

    pub async fn retry(&self) -> CatalogResult<Applied> {
        self.load().await
    }

    pub async fn dismiss_error(&self) {
        self.slot.dismiss_banner().await;
    }

    pub async fn snapshot(&self) -> SlotSnapshot<HomeCatalog> {
        self.slot.snapshot().await
    }

    pub async fn select_genre(&self, selection: GenreSelection) {
        *self.genre.write().await = selection;
    }

    pub async fn genre(&self) -> GenreSelection {
        self.genre.read().await.clone()
    }

    /// Genre names offered by the filter, drawn from the loaded entries.
    pub async fn genres(&self) -> Vec<String> {
        match self.slot.current().await {
            Some(catalog) => genre_facet(catalog.series.iter().chain(catalog.films.iter())),
            None => Vec::new(),
        }
    }

    /// The loaded catalog narrowed to the selected genre.
    pub async fn filtered(&self) -> Option<HomeCatalog> {
        let catalog = self.slot.current().await?;
        let genre = self.genre().await;
        Some(HomeCatalog {
            series: filter_by_genre(&catalog.series, &genre),
            films: filter_by_genre(&catalog.films, &genre),
        })
    }

    pub async fn shelves(&self) -> Option<HomeShelves> {
        self.filtered()
            .await
            .map(|catalog| HomeShelves::from_catalog(&catalog))
    }
}
