use crate::catalog_store::EntryKind;
use thiserror::Error;

/// Errors surfaced by the view-model layer. None of them is fatal: each is
/// scoped to the view or operation that raised it.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A backend read or write failed. Views keep their last good state.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] anyhow::Error),

    /// The identifier resolves to no non-archived entry.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntryKind, id: String },

    /// Rejected before reaching the backend.
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not allowed: {0}")]
    Permission(String),
}

impl CatalogError {
    pub fn not_found(kind: EntryKind, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Fetch(_))
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
