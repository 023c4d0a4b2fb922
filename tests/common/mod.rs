//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestCatalog, SERIES_NARUTO_ID};
//!
//! #[tokio::test]
//! async fn test_get_series() {
//!     let catalog = TestCatalog::new();
//!     let entry = catalog.backend.get_entry(EntryKind::Series, SERIES_NARUTO_ID).await;
//! }
//! ```

mod backend;
mod constants;
mod fixtures;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use backend::{BackendCall, ScriptedBackend};
pub use constants::*;
pub use fixtures::TestCatalog;

#[allow(unused_imports)]
pub(crate) use fixtures::create_test_catalog;
