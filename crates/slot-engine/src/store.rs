//! Record store surface used by the scheduling core.
//!
//! The core only needs simple filtered reads, inserts, guarded updates and
//! deletes. [`ScheduleStore`] captures that surface; [`MemoryStore`] is an
//! in-process implementation used by the CLI and the tests.
//!
//! Guarded updates are the mutual-exclusion mechanism between interactive
//! editing and automated dispatch: an update carries the state the writer
//! expects the record to still be in, and the store refuses it with
//! [`ScheduleError::Conflict`] when that no longer holds. Every successful
//! update bumps [`ScheduledPost::revision`], so a guard pinned to the
//! revision a writer read is a compare-and-swap on the whole record.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::model::{AvailabilityRule, ChannelAccount, PostId, ScheduledPost, SocialChannel};

// ── Filters and guards ──────────────────────────────────────────────────────

/// Filter for post queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub user_id: Option<String>,
    /// Exact civil date, `YYYY-MM-DD`.
    pub content_date: Option<String>,
    pub schedule_status: Option<bool>,
    pub sent_post: Option<bool>,
}

impl PostFilter {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn on_date(mut self, content_date: impl Into<String>) -> Self {
        self.content_date = Some(content_date.into());
        self
    }

    /// Only posts armed for dispatch and not yet sent.
    pub fn armed(mut self) -> Self {
        self.schedule_status = Some(true);
        self.sent_post = Some(false);
        self
    }

    pub fn matches(&self, post: &ScheduledPost) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == post.user_id)
            && self
                .content_date
                .as_ref()
                .is_none_or(|d| *d == post.content_date)
            && self
                .schedule_status
                .is_none_or(|s| s == post.schedule_status)
            && self.sent_post.is_none_or(|s| s == post.sent_post)
    }
}

/// Expected current state of a record for a conditional update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateGuard {
    /// Require `sent_post == false` on the stored record.
    pub expect_unsent: bool,
    /// Require this `schedule_status` on the stored record.
    pub expect_scheduled: Option<bool>,
    /// Require the stored record to still be at this revision.
    pub expect_revision: Option<u64>,
}

impl UpdateGuard {
    /// Unconditional update.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only while the post has not been sent.
    pub fn unsent() -> Self {
        Self {
            expect_unsent: true,
            ..Self::default()
        }
    }

    /// Only while the post is still armed and unsent.
    pub fn armed_unsent() -> Self {
        Self {
            expect_unsent: true,
            expect_scheduled: Some(true),
            expect_revision: None,
        }
    }

    /// Additionally require the record to be unchanged since `revision` was read.
    pub fn at_revision(mut self, revision: u64) -> Self {
        self.expect_revision = Some(revision);
        self
    }

    pub fn admits(&self, current: &ScheduledPost) -> bool {
        (!self.expect_unsent || !current.sent_post)
            && self
                .expect_scheduled
                .is_none_or(|s| s == current.schedule_status)
            && self.expect_revision.is_none_or(|r| r == current.revision)
    }
}

// ── ScheduleStore ───────────────────────────────────────────────────────────

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn availability_rules(&self, user_id: &str) -> Result<Vec<AvailabilityRule>>;

    async fn replace_availability_rules(
        &self,
        user_id: &str,
        rules: Vec<AvailabilityRule>,
    ) -> Result<()>;

    async fn posts(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>>;

    async fn post(&self, id: &PostId) -> Result<Option<ScheduledPost>>;

    async fn channel_account(
        &self,
        user_id: &str,
        channel: SocialChannel,
    ) -> Result<Option<ChannelAccount>>;

    /// Persist a new post. The store issues a fresh id; any id on `post` is ignored.
    async fn insert_post(&self, post: ScheduledPost) -> Result<ScheduledPost>;

    /// Overwrite the post with the same id if `guard` admits the stored record.
    ///
    /// The stored copy gets `revision = current.revision + 1` and is returned.
    ///
    /// Fails with [`ScheduleError::NotFound`] when the id is absent and
    /// [`ScheduleError::Conflict`] when the guard rejects the stored state.
    async fn update_post(&self, post: &ScheduledPost, guard: UpdateGuard)
        -> Result<ScheduledPost>;

    /// Remove a post. Returns whether a record was removed.
    async fn delete_post(&self, id: &PostId) -> Result<bool>;
}

// ── MemoryStore ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Inner {
    rules: HashMap<String, Vec<AvailabilityRule>>,
    posts: BTreeMap<PostId, ScheduledPost>,
    accounts: HashMap<(String, SocialChannel), ChannelAccount>,
}

/// In-process [`ScheduleStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, keeping their ids.
    pub fn with_records(
        rules: HashMap<String, Vec<AvailabilityRule>>,
        posts: Vec<ScheduledPost>,
        accounts: Vec<ChannelAccount>,
    ) -> Self {
        let inner = Inner {
            rules,
            posts: posts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            accounts: accounts
                .into_iter()
                .map(|a| ((a.user_id.clone(), a.channel), a))
                .collect(),
        };
        Self {
            inner: RwLock::new(inner),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub async fn add_channel_account(&self, account: ChannelAccount) {
        let mut inner = self.inner.write().await;
        inner
            .accounts
            .insert((account.user_id.clone(), account.channel), account);
    }

    /// Make every subsequent write fail with [`ScheduleError::Persistence`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ScheduleError::Persistence(
                "store is rejecting writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn availability_rules(&self, user_id: &str) -> Result<Vec<AvailabilityRule>> {
        let inner = self.inner.read().await;
        Ok(inner.rules.get(user_id).cloned().unwrap_or_default())
    }

    async fn replace_availability_rules(
        &self,
        user_id: &str,
        rules: Vec<AvailabilityRule>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        inner.rules.insert(user_id.to_string(), rules);
        Ok(())
    }

    async fn posts(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .values()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect())
    }

    async fn post(&self, id: &PostId) -> Result<Option<ScheduledPost>> {
        let inner = self.inner.read().await;
        Ok(inner.posts.get(id).cloned())
    }

    async fn channel_account(
        &self,
        user_id: &str,
        channel: SocialChannel,
    ) -> Result<Option<ChannelAccount>> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.get(&(user_id.to_string(), channel)).cloned())
    }

    async fn insert_post(&self, mut post: ScheduledPost) -> Result<ScheduledPost> {
        self.check_writable()?;
        post.id = PostId::new(uuid::Uuid::new_v4().to_string());
        post.revision = 0;
        let mut inner = self.inner.write().await;
        inner.posts.insert(post.id.clone(), post.clone());
        debug!(post_id = %post.id, "inserted post");
        Ok(post)
    }

    async fn update_post(
        &self,
        post: &ScheduledPost,
        guard: UpdateGuard,
    ) -> Result<ScheduledPost> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let current = inner
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| ScheduleError::NotFound(post.id.to_string()))?;
        if !guard.admits(current) {
            return Err(ScheduleError::Conflict(format!(
                "post {} changed concurrently",
                post.id
            )));
        }
        let mut stored = post.clone();
        stored.revision = current.revision + 1;
        *current = stored.clone();
        Ok(stored)
    }

    async fn delete_post(&self, id: &PostId) -> Result<bool> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        Ok(inner.posts.remove(id).is_some())
    }
}
