//! Detail-page addresses and sharing.

use crate::catalog_store::{CatalogEntry, EntryKind};
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

const SERIES_PREFIX: &str = "/anime/";
const FILM_PREFIX: &str = "/movie/";

/// Address of an entry's detail page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EntryRoute {
    pub kind: EntryKind,
    pub id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not an entry route: {0}")]
pub struct RouteParseError(String);

impl EntryRoute {
    pub fn new(kind: EntryKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self::new(entry.kind, entry.id.clone())
    }
}

impl fmt::Display for EntryRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            EntryKind::Series => SERIES_PREFIX,
            EntryKind::Film => FILM_PREFIX,
        };
        write!(f, "{}{}", prefix, self.id)
    }
}

impl FromStr for EntryRoute {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = if let Some(rest) = s.strip_prefix(SERIES_PREFIX) {
            (EntryKind::Series, rest)
        } else if let Some(rest) = s.strip_prefix(FILM_PREFIX) {
            (EntryKind::Film, rest)
        } else {
            return Err(RouteParseError(s.to_string()));
        };

        let id = rest.trim_end_matches('/');
        if id.is_empty() || id.contains('/') {
            return Err(RouteParseError(s.to_string()));
        }
        Ok(Self::new(kind, id))
    }
}

/// What gets handed to a share sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    pub fn for_entry(entry: &CatalogEntry, base_url: &str) -> Self {
        Self {
            title: entry.title.clone(),
            text: format!("Check out {} on Anidost!", entry.title),
            url: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                EntryRoute::for_entry(entry)
            ),
        }
    }

    /// Text copied when no native share is available.
    pub fn clipboard_text(&self) -> String {
        format!("{} - {}", self.title, self.url)
    }
}

/// Platform sharing facilities.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ShareTarget: Send + Sync {
    fn supports_native_share(&self) -> bool;

    async fn share_native(&self, payload: &SharePayload) -> anyhow::Result<()>;

    async fn copy_to_clipboard(&self, text: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareOutcome {
    Shared,
    Copied,
}

/// Shares natively when possible, otherwise copies the clipboard text.
/// A failed native share also falls back to the clipboard.
pub async fn share(target: &dyn ShareTarget, payload: &SharePayload) -> CatalogResult<ShareOutcome> {
    if target.supports_native_share() {
        match target.share_native(payload).await {
            Ok(()) => {
                debug!("Shared {} natively", payload.url);
                return Ok(ShareOutcome::Shared);
            }
            Err(err) => warn!("Native share failed, copying instead: {:#}", err),
        }
    }

    target
        .copy_to_clipboard(&payload.clipboard_text())
        .await
        .map_err(CatalogError::Fetch)?;
    Ok(ShareOutcome::Copied)
}
