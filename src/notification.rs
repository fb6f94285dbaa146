//! Inbound post notifications.
//!
//! When the external service reports a new post by the bot, its id is
//! attached to the matching record. A record tracks only the first post
//! reported for its link, and only that post is pinned while featured.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::db::{Database, PostRepository};
use crate::posting::{DestinationId, ExternalPostId, PostingService};
use crate::Result;

/// A post observed on the external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEvent {
    /// Id of the new post.
    pub post_id: ExternalPostId,
    /// Link the post points at, if any.
    pub url: Option<String>,
    /// Account name of the post's author.
    pub author: String,
    /// Destination the post was made in.
    pub destination: DestinationId,
}

/// What the handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a post by the bot, or no link.
    Ignored,
    /// No record exists for the link.
    Unknown,
    /// The id was recorded; the record is not featured.
    Recorded,
    /// The record already tracks a different post; this one is left alone.
    Untracked,
    /// The id was recorded and the post was pinned.
    Pinned,
}

/// Applies post events to the store.
pub struct NotificationHandler {
    db: Arc<Database>,
    poster: Arc<dyn PostingService>,
    username: String,
}

impl NotificationHandler {
    /// Create a handler recognising posts by `username`.
    pub fn new(
        db: Arc<Database>,
        poster: Arc<dyn PostingService>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            db,
            poster,
            username: username.into(),
        }
    }

    /// Handle one event.
    pub async fn handle(&self, event: &PostEvent) -> Result<EventOutcome> {
        if event.author != self.username {
            return Ok(EventOutcome::Ignored);
        }
        let Some(url) = event.url.as_deref() else {
            return Ok(EventOutcome::Ignored);
        };

        let posts = PostRepository::new(self.db.pool());
        let Some(record) = posts.record_external_id(url, event.post_id).await? else {
            debug!("No record for post {} ({})", event.post_id, url);
            return Ok(EventOutcome::Unknown);
        };

        // Only the tracked post is ever unfeatured, so only it may be pinned.
        if record.external_post_id != Some(event.post_id) {
            debug!(
                "Post {} for {} not tracked (tracking {:?})",
                event.post_id, url, record.external_post_id
            );
            return Ok(EventOutcome::Untracked);
        }

        if !record.featured {
            return Ok(EventOutcome::Recorded);
        }

        self.poster.set_featured(event.post_id, true).await?;
        info!(
            "Pinned post {} in {} for {} day(s)",
            event.post_id, event.destination, record.pin_days
        );
        Ok(EventOutcome::Pinned)
    }

    /// Handle events until the channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<PostEvent>) {
        info!("Post notification listener started");
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(&event).await {
                warn!("Failed to handle post {}: {}", event.post_id, e);
            }
        }
        info!("Post notification listener stopped");
    }
}

/// Spawn the notification listener as a background task.
pub fn start_listener(
    handler: NotificationHandler,
    events: mpsc::Receiver<PostEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(handler.run(events))
}
