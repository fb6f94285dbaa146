//! External posting service interface.
//!
//! The federated publishing service is an external collaborator. The
//! dispatch loop, decay clock and notification handler talk to it only
//! through [`PostingService`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::Result;

/// Identifier of a destination community on the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationId(pub i64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a post on the external service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalPostId(pub i64);

impl fmt::Display for ExternalPostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Post title (already translated to markup).
    pub title: String,
    /// Post body (already translated to markup).
    pub body: String,
    /// Link to the original article.
    pub link: String,
}

/// Operations consumed from the external publishing service.
///
/// Failures are reported as [`crate::FeedpinError::External`].
#[async_trait]
pub trait PostingService: Send + Sync {
    /// Resolve a community on an instance to its destination id.
    async fn resolve_destination(&self, community: &str, instance: &str)
        -> Result<DestinationId>;

    /// Create a post in a destination.
    async fn create_post(&self, post: &NewPost, destination: DestinationId)
        -> Result<ExternalPostId>;

    /// Feature (pin) or unfeature a post within its community.
    async fn set_featured(&self, post_id: ExternalPostId, featured: bool) -> Result<()>;
}

/// Posting service that only logs what it would do.
///
/// Used when no publishing client is wired in; ids are synthetic.
#[derive(Debug, Default)]
pub struct DryRunPoster {
    next_id: AtomicI64,
}

impl DryRunPoster {
    /// Create a new dry-run poster.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostingService for DryRunPoster {
    async fn resolve_destination(
        &self,
        community: &str,
        instance: &str,
    ) -> Result<DestinationId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!("[dry-run] Resolved {}@{} to {}", community, instance, id);
        Ok(DestinationId(id))
    }

    async fn create_post(
        &self,
        post: &NewPost,
        destination: DestinationId,
    ) -> Result<ExternalPostId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            "[dry-run] Created post {} for {} in {}",
            id, post.link, destination
        );
        Ok(ExternalPostId(id))
    }

    async fn set_featured(&self, post_id: ExternalPostId, featured: bool) -> Result<()> {
        info!("[dry-run] Set post {} featured={}", post_id, featured);
        Ok(())
    }
}
