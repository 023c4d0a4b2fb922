//! View models built from catalog rows: aggregated slices, episode and film
//! link groupings, genre filtering and the pages that combine them.

mod aggregator;
mod detail;
mod episodes;
mod film_links;
mod genre_filter;
mod home;
mod library;
mod slot;
mod watch;

pub use aggregator::{sort_by_rating, CatalogAggregator};
pub use detail::{FilmDetail, FilmDetailView, SeriesDetail, SeriesDetailView};
pub use episodes::{
    EpisodeGrouping, EpisodeRow, EpisodeSelection, DEFAULT_EPISODE_MINUTES, DEFAULT_SEASON,
    UNKNOWN_LANGUAGE,
};
pub use film_links::{FilmLinkGroups, DEFAULT_FILM_LANGUAGE};
pub use genre_filter::{filter_by_genre, genre_facet, GenreSelection, ALL_GENRES};
pub use home::{HomeCatalog, HomeShelves, HomeView};
pub use library::{filter_by_text, FilmLibrary};
pub use slot::{Applied, Content, GuardedSlot, SlotSnapshot};
pub use watch::record_play;
