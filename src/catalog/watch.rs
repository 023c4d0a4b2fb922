use crate::catalog_store::{CatalogBackend, EntryKind, WatchHistoryUpdate};
use crate::error::CatalogResult;
use crate::session::SessionContext;
use tracing::info;

/// Records that the signed-in user started watching an entry.
///
/// Series plays are recorded against an episode (the first one unless
/// given); films are recorded as a whole.
pub async fn record_play(
    backend: &dyn CatalogBackend,
    session: &SessionContext,
    kind: EntryKind,
    entry_id: &str,
    episode: Option<u32>,
) -> CatalogResult<WatchHistoryUpdate> {
    let user_id = session.require_user("keep a watch history")?;

    let update = WatchHistoryUpdate {
        user_id: user_id.to_string(),
        kind,
        entry_id: entry_id.to_string(),
        episode_number: match kind {
            EntryKind::Series => Some(episode.unwrap_or(1)),
            EntryKind::Film => None,
        },
        progress_seconds: 0,
        last_watched_at: chrono::Utc::now().timestamp(),
    };
    backend.upsert_watch_history(&update).await?;

    info!(
        "User {} started {} {} (episode {:?})",
        user_id, kind, entry_id, update.episode_number
    );
    Ok(update)
}
