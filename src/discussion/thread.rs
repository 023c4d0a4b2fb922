use super::relative_time::format_relative;
use crate::catalog::{Applied, GuardedSlot, SlotSnapshot};
use crate::catalog_store::{CatalogBackend, CommentDeletion, CommentRecord, CommentTarget};
use crate::error::{CatalogError, CatalogResult};
use crate::session::SessionContext;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Display name for authors whose profile cannot be resolved.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

const PROFILE_LOOKUP_CONCURRENCY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadComment {
    pub id: String,
    pub content: String,
    /// Unix seconds, UTC
    pub created_at: i64,
    pub author_id: String,
    pub author_name: String,
}

impl ThreadComment {
    pub fn age(&self, now: i64) -> String {
        format_relative(self.created_at, now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(CommentRecord),
    /// Another post from this thread was still in flight.
    Ignored,
}

/// Comments of a single series or film.
///
/// Every successful mutation is followed by a full re-fetch; the local list
/// is never edited in place.
pub struct DiscussionThread {
    backend: Arc<dyn CatalogBackend>,
    target: CommentTarget,
    slot: GuardedSlot<Vec<ThreadComment>>,
    mutation_error: RwLock<Option<String>>,
    posting: AtomicBool,
}

impl DiscussionThread {
    pub fn new(backend: Arc<dyn CatalogBackend>, target: CommentTarget) -> Self {
        Self {
            backend,
            target,
            slot: GuardedSlot::new(),
            mutation_error: RwLock::new(None),
            posting: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> &CommentTarget {
        &self.target
    }

    /// Loads all comments, newest first, with author names resolved.
    ///
    /// On failure the previously loaded comments stay visible.
    pub async fn fetch(&self) -> CatalogResult<Applied> {
        let ticket = self.slot.begin().await;
        let result = self.load_comments().await;
        self.slot.apply(ticket, result).await
    }

    async fn load_comments(&self) -> CatalogResult<Vec<ThreadComment>> {
        let mut records = self.backend.list_comments(&self.target).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let authors: BTreeSet<String> = records.iter().map(|r| r.user_id.clone()).collect();
        let names: HashMap<String, String> = stream::iter(authors)
            .map(|user_id| async move {
                let name = self.author_name(&user_id).await;
                (user_id, name)
            })
            .buffered(PROFILE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let comments = records
            .iter()
            .map(|r| ThreadComment {
                id: r.id.clone(),
                content: r.content.clone(),
                created_at: r.created_at,
                author_id: r.user_id.clone(),
                author_name: names
                    .get(&r.user_id)
                    .cloned()
                    .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            })
            .collect();
        Ok(comments)
    }

    async fn author_name(&self, user_id: &str) -> String {
        match self.backend.get_profile_name(user_id).await {
            Ok(Some(name)) => name,
            Ok(None) => ANONYMOUS_AUTHOR.to_string(),
            Err(err) => {
                warn!("Failed to resolve author {}: {:#}", user_id, err);
                ANONYMOUS_AUTHOR.to_string()
            }
        }
    }

    pub async fn snapshot(&self) -> SlotSnapshot<Vec<ThreadComment>> {
        self.slot.snapshot().await
    }

    pub async fn comments(&self) -> Vec<ThreadComment> {
        self.slot
            .current()
            .await
            .map(|comments| comments.as_ref().clone())
            .unwrap_or_default()
    }

    pub fn is_posting(&self) -> bool {
        self.posting.load(Ordering::SeqCst)
    }

    /// Last failed post or delete, until dismissed or a mutation succeeds.
    pub async fn mutation_error(&self) -> Option<String> {
        self.mutation_error.read().await.clone()
    }

    pub async fn dismiss_errors(&self) {
        *self.mutation_error.write().await = None;
        self.slot.dismiss_banner().await;
    }

    /// Whether `session` may delete `comment`.
    pub fn can_delete(&self, session: &SessionContext, comment: &ThreadComment) -> bool {
        session.user_id() == Some(comment.author_id.as_str())
    }

    /// Posts a comment as the signed-in user, then re-fetches the thread.
    ///
    /// Blank content and anonymous sessions are rejected without touching the
    /// backend. While an earlier post is in flight this returns
    /// [`PostOutcome::Ignored`].
    pub async fn post(&self, session: &SessionContext, content: &str) -> CatalogResult<PostOutcome> {
        let author = session.require_user("comment")?;
        let content = content.trim();
        if content.is_empty() {
            return Err(CatalogError::Validation(
                "comment cannot be empty".to_string(),
            ));
        }

        let Some(_guard) = PostingGuard::acquire(&self.posting) else {
            debug!("Post on {:?} ignored, previous post pending", self.target);
            return Ok(PostOutcome::Ignored);
        };

        let record = match self.backend.insert_comment(&self.target, author, content).await {
            Ok(record) => record,
            Err(err) => return Err(self.mutation_failed("post", err).await),
        };
        info!("User {} commented on {:?}", author, self.target);
        *self.mutation_error.write().await = None;

        self.refresh_after_mutation().await;
        Ok(PostOutcome::Posted(record))
    }

    /// Deletes `comment_id` on behalf of the signed-in user.
    ///
    /// Refused locally when the loaded thread shows someone else as the
    /// author; the backend re-checks authorship either way.
    pub async fn delete(&self, session: &SessionContext, comment_id: &str) -> CatalogResult<()> {
        let user = session.require_user("delete comments")?;

        let loaded = self.comments().await;
        if let Some(comment) = loaded.iter().find(|c| c.id == comment_id) {
            if !self.can_delete(session, comment) {
                debug!("Refusing deletion of comment {} by {}", comment_id, user);
                return Err(self.forbidden().await);
            }
        }

        let outcome = match self.backend.delete_comment(comment_id, user).await {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.mutation_failed("delete", err).await),
        };

        match outcome {
            CommentDeletion::Deleted => {
                info!("User {} deleted comment {}", user, comment_id);
                *self.mutation_error.write().await = None;
                self.refresh_after_mutation().await;
                Ok(())
            }
            CommentDeletion::Forbidden => {
                warn!(
                    "Backend refused deletion of comment {} by {}",
                    comment_id, user
                );
                Err(self.forbidden().await)
            }
            CommentDeletion::NotFound => {
                self.refresh_after_mutation().await;
                let err = CatalogError::Validation(format!(
                    "comment {} no longer exists",
                    comment_id
                ));
                *self.mutation_error.write().await = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn refresh_after_mutation(&self) {
        if let Err(err) = self.fetch().await {
            warn!("Failed to refresh comments on {:?}: {}", self.target, err);
        }
    }

    async fn forbidden(&self) -> CatalogError {
        let err = CatalogError::Permission("only the author can delete this comment".to_string());
        *self.mutation_error.write().await = Some(err.to_string());
        err
    }

    async fn mutation_failed(&self, action: &str, err: anyhow::Error) -> CatalogError {
        warn!("Failed to {} comment on {:?}: {:#}", action, self.target, err);
        let err = CatalogError::Fetch(err);
        *self.mutation_error.write().await = Some(err.to_string());
        err
    }
}

/// Holds the posting flag for the lifetime of one post.
struct PostingGuard<'a>(&'a AtomicBool);

impl<'a> PostingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
