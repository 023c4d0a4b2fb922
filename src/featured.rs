//! Featured-content carousel.
//!
//! The pool is loaded once and never changes afterwards. A background ticker
//! advances the shared index on a fixed cadence; manual navigation writes the
//! same index and leaves the ticker's schedule alone.

use crate::catalog::CatalogAggregator;
use crate::catalog_store::{CatalogEntry, EntryKind};
use crate::config::FeaturedSettings;
use crate::navigation::EntryRoute;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_BLURB: &str = "Amazing content";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeaturedItem {
    pub entry: CatalogEntry,
    pub route: String,
    pub blurb: String,
    pub image: String,
}

impl FeaturedItem {
    pub fn from_entry(entry: CatalogEntry) -> Self {
        let blurb = [entry.description.as_deref(), entry.synopsis.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BLURB)
            .to_string();
        Self {
            route: EntryRoute::for_entry(&entry).to_string(),
            image: entry.image_ref().to_string(),
            blurb,
            entry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeaturedState {
    /// Nothing to show; the carousel renders its loading placeholder.
    Empty,
    Showing {
        index: usize,
        total: usize,
        item: FeaturedItem,
    },
}

pub struct FeaturedRotator {
    items: Arc<Vec<FeaturedItem>>,
    index: Arc<AtomicUsize>,
    interval: Duration,
    load_error: Option<String>,
    ticker: Mutex<Option<CancellationToken>>,
}

impl FeaturedRotator {
    /// Builds the pool from the top `per_kind` series followed by the top
    /// `per_kind` films. A failed query contributes nothing to the pool and
    /// its error is kept in [`FeaturedRotator::load_error`].
    pub async fn load(aggregator: &CatalogAggregator, settings: &FeaturedSettings) -> Self {
        let limit = Some(settings.per_kind);
        let (series, films) = tokio::join!(
            aggregator.list(EntryKind::Series, limit),
            aggregator.list(EntryKind::Film, limit),
        );

        let mut items = Vec::new();
        let mut errors = Vec::new();
        for (kind, result) in [(EntryKind::Series, series), (EntryKind::Film, films)] {
            match result {
                Ok(entries) => items.extend(
                    entries
                        .into_iter()
                        .take(settings.per_kind)
                        .map(FeaturedItem::from_entry),
                ),
                Err(err) => {
                    warn!("Failed to load featured {}: {}", kind, err);
                    errors.push(format!("{}: {}", kind, err));
                }
            }
        }
        let load_error = (!errors.is_empty()).then(|| errors.join("; "));

        info!("Featured pool has {} items", items.len());
        Self::with_items(items, settings.rotation_interval, load_error)
    }

    pub fn with_items(
        items: Vec<FeaturedItem>,
        interval: Duration,
        load_error: Option<String>,
    ) -> Self {
        Self {
            items: Arc::new(items),
            index: Arc::new(AtomicUsize::new(0)),
            interval,
            load_error,
            ticker: Mutex::new(None),
        }
    }

    pub fn items(&self) -> &[FeaturedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<&FeaturedItem> {
        self.items.get(self.index())
    }

    pub fn state(&self) -> FeaturedState {
        let index = self.index();
        match self.items.get(index) {
            Some(item) => FeaturedState::Showing {
                index,
                total: self.items.len(),
                item: item.clone(),
            },
            None => FeaturedState::Empty,
        }
    }

    /// Starts the rotation ticker. Does nothing if the pool is empty or the
    /// ticker is already running. Must be called from within a tokio runtime.
    pub fn start(&self) {
        if self.items.is_empty() {
            debug!("Featured pool is empty, not rotating");
            return;
        }
        let mut ticker = self.lock_ticker();
        if ticker.is_some() {
            return;
        }

        let token = CancellationToken::new();
        *ticker = Some(token.clone());

        let index = Arc::clone(&self.index);
        let len = self.items.len();
        let period = self.interval;
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Featured rotation stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        advance(&index, len, 1);
                    }
                }
            }
        });
    }

    /// Stops the ticker. The current index is kept.
    pub fn stop(&self) {
        if let Some(token) = self.lock_ticker().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_ticker().is_some()
    }

    pub fn next(&self) -> Option<usize> {
        (!self.items.is_empty()).then(|| advance(&self.index, self.items.len(), 1))
    }

    pub fn prev(&self) -> Option<usize> {
        let len = self.items.len();
        (len > 0).then(|| advance(&self.index, len, len - 1))
    }

    /// Shows item `index`. Out-of-range indices are ignored.
    pub fn jump(&self, index: usize) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.index.store(index, Ordering::SeqCst);
        true
    }

    fn lock_ticker(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        match self.ticker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for FeaturedRotator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Moves `index` forward by `step` modulo `len` and returns the new value.
fn advance(index: &AtomicUsize, len: usize, step: usize) -> usize {
    let mut next = 0;
    let _ = index.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
        next = (current + step) % len;
        Some(next)
    });
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::entry;
    use tokio::time::sleep;

    fn pool(n: usize) -> Vec<FeaturedItem> {
        (0..n)
            .map(|i| FeaturedItem::from_entry(entry(&format!("s{}", i), Some(9.0))))
            .collect()
    }

    #[test]
    fn test_blurb_fallbacks() {
        let mut e = entry("s1", None);
        assert_eq!(FeaturedItem::from_entry(e.clone()).blurb, DEFAULT_BLURB);

        e.synopsis = Some("A synopsis".to_string());
        assert_eq!(FeaturedItem::from_entry(e.clone()).blurb, "A synopsis");

        e.description = Some("  ".to_string());
        assert_eq!(FeaturedItem::from_entry(e.clone()).blurb, "A synopsis");

        e.description = Some("A description".to_string());
        let item = FeaturedItem::from_entry(e);
        assert_eq!(item.blurb, "A description");
        assert_eq!(item.route, "/anime/s1");
        assert_eq!(item.image, "/placeholder.svg");
    }

    #[test]
    fn test_manual_navigation_wraps() {
        let rotator = FeaturedRotator::with_items(pool(3), Duration::from_secs(8), None);
        assert_eq!(rotator.prev(), Some(2));
        assert_eq!(rotator.next(), Some(0));
        assert!(rotator.jump(2));
        assert_eq!(rotator.next(), Some(0));
        assert!(!rotator.jump(3));
        assert_eq!(rotator.index(), 0);
    }

    #[test]
    fn test_empty_pool_reports_empty() {
        let rotator = FeaturedRotator::with_items(Vec::new(), Duration::from_secs(8), None);
        assert_eq!(rotator.state(), FeaturedState::Empty);
        assert_eq!(rotator.next(), None);
        assert_eq!(rotator.prev(), None);
        assert!(!rotator.jump(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_advances_until_stopped() {
        let rotator = FeaturedRotator::with_items(pool(3), Duration::from_millis(8000), None);
        rotator.start();
        assert!(rotator.is_running());

        sleep(Duration::from_millis(7900)).await;
        assert_eq!(rotator.index(), 0);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(rotator.index(), 1);

        rotator.stop();
        sleep(Duration::from_millis(20_000)).await;
        assert_eq!(rotator.index(), 1);
        assert!(!rotator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_pool_never_starts() {
        let rotator = FeaturedRotator::with_items(Vec::new(), Duration::from_millis(8000), None);
        rotator.start();
        assert!(!rotator.is_running());
    }
}
