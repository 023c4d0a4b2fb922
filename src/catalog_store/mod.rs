//! Catalog storage: models, schema, backend contract and its SQLite implementation.

mod models;
mod schema;
mod store;
mod trait_def;
mod validation;

pub use models::{
    CatalogEntry, CommentDeletion, CommentRecord, CommentTarget, EntryKind, EpisodeLink,
    EpisodeRecord, FilmLink, GenreAssociation, LifecycleStatus, WatchHistoryUpdate,
    MAX_EPISODE_COUNT, PLACEHOLDER_IMAGE,
};
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogBackend;
pub use validation::RowShapeError;

#[cfg(feature = "mock")]
pub use trait_def::MockCatalogBackend;
