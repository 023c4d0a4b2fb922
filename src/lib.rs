//! Anidost catalog client library
//!
//! Builds the view models a presentation layer renders for the Anidost
//! catalog: rated entry shelves, grouped episodes and film links, genre
//! filters, debounced search, the featured carousel and discussion threads.

pub mod catalog;
pub mod catalog_store;
pub mod config;
pub mod discussion;
pub mod error;
pub mod featured;
pub mod navigation;
pub mod search;
pub mod session;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog::CatalogAggregator;
pub use catalog_store::{CatalogBackend, SqliteCatalogStore};
pub use error::{CatalogError, CatalogResult};
pub use session::SessionContext;
