//! Publish adapter contract for external social platforms.
//!
//! The HTTP calls themselves live outside this crate. An adapter receives the
//! post content, its attachments, the channel credentials and an idempotency
//! key, and answers with the platform's id for the new post or an error.
//! Adapters are not required to deduplicate; the dispatcher avoids calling
//! twice for the same post, and the idempotency key lets platforms that
//! support it drop a repeated call after a crash.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ScheduleError};
use crate::model::{Credentials, PostId, ScheduledPost, SocialChannel};

/// Everything an adapter needs to publish one post.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub post_id: PostId,
    pub content: String,
    pub photo_url: Option<String>,
    pub video_url: Option<String>,
    pub credentials: Credentials,
    pub idempotency_key: String,
}

impl PublishRequest {
    pub fn for_post(post: &ScheduledPost, credentials: Credentials, idempotency_key: &str) -> Self {
        Self {
            post_id: post.id.clone(),
            content: post.full_content.clone(),
            photo_url: post.photo_url.clone(),
            video_url: post.video_url.clone(),
            credentials,
            idempotency_key: idempotency_key.to_string(),
        }
    }
}

/// Successful publish outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// The platform's id for the published post.
    pub remote_id: String,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn channel(&self) -> SocialChannel;

    /// Whether the platform drops repeated calls carrying the same idempotency key.
    fn deduplicates(&self) -> bool {
        false
    }

    /// Publish the post, failing with [`ScheduleError::Publish`] on rejection.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt>;
}

/// Publish with a hard per-attempt deadline; an elapsed deadline is a publish failure.
pub async fn publish_with_timeout(
    publisher: &dyn Publisher,
    request: &PublishRequest,
    timeout: Duration,
) -> Result<PublishReceipt> {
    match tokio::time::timeout(timeout, publisher.publish(request)).await {
        Ok(result) => result,
        Err(_) => Err(ScheduleError::Publish(format!(
            "{} publish timed out after {}s",
            publisher.channel(),
            timeout.as_secs_f64()
        ))),
    }
}

/// Adapters keyed by the channel they serve.
#[derive(Clone, Default)]
pub struct PublisherRegistry {
    publishers: HashMap<SocialChannel, Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for its channel.
    pub fn register(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publishers.insert(publisher.channel(), publisher);
        self
    }

    pub fn get(&self, channel: SocialChannel) -> Option<Arc<dyn Publisher>> {
        self.publishers.get(&channel).cloned()
    }

    pub fn channels(&self) -> impl Iterator<Item = SocialChannel> + '_ {
        self.publishers.keys().copied()
    }
}

impl std::fmt::Debug for PublisherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<_> = self.channels().collect();
        channels.sort();
        f.debug_struct("PublisherRegistry")
            .field("channels", &channels)
            .finish()
    }
}

/// Adapter that logs instead of calling the platform.
#[derive(Debug, Clone, Copy)]
pub struct DryRunPublisher {
    channel: SocialChannel,
}

impl DryRunPublisher {
    pub fn new(channel: SocialChannel) -> Self {
        Self { channel }
    }

    /// A registry with a dry-run adapter for every channel.
    pub fn registry() -> PublisherRegistry {
        [
            SocialChannel::Bluesky,
            SocialChannel::LinkedIn,
            SocialChannel::Twitter,
        ]
        .into_iter()
        .fold(PublisherRegistry::new(), |registry, channel| {
            registry.register(Arc::new(DryRunPublisher::new(channel)))
        })
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn channel(&self) -> SocialChannel {
        self.channel
    }

    fn deduplicates(&self) -> bool {
        true
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        info!(
            channel = %self.channel,
            post_id = %request.post_id,
            idempotency_key = %request.idempotency_key,
            "dry run publish"
        );
        Ok(PublishReceipt {
            remote_id: format!("dry-run-{}", request.idempotency_key),
        })
    }
}
