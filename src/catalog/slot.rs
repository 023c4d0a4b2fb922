//! Generation-guarded holder for one view's loaded state.
//!
//! Every load takes a ticket from [`GuardedSlot::begin`]; only the response
//! carrying the most recent ticket may change what the view shows.

use crate::error::{CatalogError, CatalogResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
pub enum Content<T> {
    Empty,
    Ready(Arc<T>),
    NotFound,
}

impl<T> Clone for Content<T> {
    fn clone(&self) -> Self {
        match self {
            Content::Empty => Content::Empty,
            Content::Ready(value) => Content::Ready(Arc::clone(value)),
            Content::NotFound => Content::NotFound,
        }
    }
}

#[derive(Debug)]
pub struct SlotSnapshot<T> {
    /// Id the content belongs to, for slots loaded by key.
    pub key: Option<String>,
    pub content: Content<T>,
    pub loading: bool,
    /// Message for a dismissible error banner.
    pub banner: Option<String>,
}

impl<T> Clone for SlotSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            content: self.content.clone(),
            loading: self.loading,
            banner: self.banner.clone(),
        }
    }
}

impl<T> SlotSnapshot<T> {
    pub fn ready(&self) -> Option<&Arc<T>> {
        match &self.content {
            Content::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.content, Content::NotFound)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Current,
    /// A newer load was started; the response was dropped.
    Stale,
}

pub struct GuardedSlot<T> {
    generation: AtomicU64,
    state: RwLock<SlotSnapshot<T>>,
}

impl<T> Default for GuardedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GuardedSlot<T> {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            state: RwLock::new(SlotSnapshot {
                key: None,
                content: Content::Empty,
                loading: false,
                banner: None,
            }),
        }
    }

    /// Starts a load and returns its ticket. Current content is kept until
    /// the response arrives.
    pub async fn begin(&self) -> u64 {
        let mut state = self.state.write().await;
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.loading = true;
        ticket
    }

    /// Starts a load of `key`. Content loaded for a different key is cleared
    /// right away, so a failed load never leaves another entry on display.
    pub async fn begin_for(&self, key: &str) -> u64 {
        let mut state = self.state.write().await;
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if state.key.as_deref() != Some(key) {
            state.key = Some(key.to_string());
            state.content = Content::Empty;
            state.banner = None;
        }
        state.loading = true;
        ticket
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Applies a load result if `ticket` is still the latest.
    ///
    /// A fetch failure keeps the previous content for the same key and raises
    /// the banner. The error is handed back to the caller either way.
    /// `NotFound` replaces the content with the terminal not-found state.
    pub async fn apply(&self, ticket: u64, result: CatalogResult<T>) -> CatalogResult<Applied> {
        let mut state = self.state.write().await;
        if !self.is_current(ticket) {
            debug!(
                "Dropping response for load {} (latest is {})",
                ticket,
                self.generation.load(Ordering::SeqCst)
            );
            return Ok(Applied::Stale);
        }

        state.loading = false;
        match result {
            Ok(value) => {
                state.content = Content::Ready(Arc::new(value));
                state.banner = None;
                Ok(Applied::Current)
            }
            Err(err @ CatalogError::NotFound { .. }) => {
                state.content = Content::NotFound;
                state.banner = None;
                Err(err)
            }
            Err(err) => {
                state.banner = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn snapshot(&self) -> SlotSnapshot<T> {
        self.state.read().await.clone()
    }

    pub async fn current(&self) -> Option<Arc<T>> {
        self.state.read().await.ready().cloned()
    }

    pub async fn dismiss_banner(&self) {
        self.state.write().await.banner = None;
    }
}
