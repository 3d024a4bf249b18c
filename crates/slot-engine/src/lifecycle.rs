//! Post lifecycle: create, update, reschedule, copy, delete, pause, activate.
//!
//! Every write goes through [`ScheduleStore`] with an [`UpdateGuard`] that
//! requires the post to still be unsent and at the revision the edit was
//! computed from. An edit racing the dispatcher can therefore never overwrite
//! the `sent_post` transition, nor the token, claim or error it records.
//! When the revision moved, the edit is reapplied to the fresh record.
//!
//! Creation is split in two phases for optimistic editors:
//! [`PostLifecycleManager::prepare_create`] validates and returns the
//! tentative post right away, and [`PostLifecycleManager::commit_create`]
//! persists it. The `*_optimistic` helpers run both phases against a
//! [`ScheduleBoard`] and hand back the reconciled or rolled-back board.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::availability;
use crate::error::{Result, ScheduleError};
use crate::model::{DayOfWeek, PostId, ScheduledPost, SocialChannel};
use crate::projection::{BoardEvent, ScheduleBoard};
use crate::store::{ScheduleStore, UpdateGuard};
use crate::temporal::{
    civil_today, parse_civil_date, parse_timezone, parse_wall_clock, DATE_FORMAT, TIME_FORMAT,
};

/// Attempts at reapplying an edit when the record keeps changing underneath it.
const EDIT_ATTEMPTS: usize = 3;

/// Fields a user supplies for a new post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostInput {
    pub user_id: String,
    pub social_channel: SocialChannel,
    pub content_date: String,
    pub content_time: String,
    pub full_content: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Partial edit of an unsent post. `None` leaves a field unchanged; for
/// attachments `Some(None)` clears the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default)]
    pub content_date: Option<String>,
    #[serde(default)]
    pub content_time: Option<String>,
    #[serde(default)]
    pub full_content: Option<String>,
    #[serde(default)]
    pub photo_url: Option<Option<String>>,
    #[serde(default)]
    pub video_url: Option<Option<String>>,
}

impl PostPatch {
    pub fn reschedule(content_date: impl Into<String>, content_time: impl Into<String>) -> Self {
        Self {
            content_date: Some(content_date.into()),
            content_time: Some(content_time.into()),
            ..Default::default()
        }
    }

    fn apply_to(&self, post: &mut ScheduledPost) {
        if let Some(date) = &self.content_date {
            post.content_date = date.clone();
        }
        if let Some(time) = &self.content_time {
            post.content_time = time.clone();
        }
        if let Some(content) = &self.full_content {
            post.full_content = content.clone();
        }
        if let Some(photo) = &self.photo_url {
            post.photo_url = photo.clone();
        }
        if let Some(video) = &self.video_url {
            post.video_url = video.clone();
        }
    }
}

/// The editor's clock and zone, used for the past-date guard.
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub now: DateTime<Utc>,
    /// IANA zone of the person editing (the viewer), not of the channel.
    pub local_timezone: String,
}

impl EditorContext {
    pub fn new(now: DateTime<Utc>, local_timezone: impl Into<String>) -> Self {
        Self {
            now,
            local_timezone: local_timezone.into(),
        }
    }
}

/// A validated post awaiting persistence.
#[derive(Debug, Clone)]
pub struct PendingCreate {
    /// The optimistic record, carrying a tentative id.
    pub tentative: ScheduledPost,
}

pub struct PostLifecycleManager<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ScheduleStore + ?Sized> Clone for PostLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Validate a wall-clock string and normalize it to `HH:mm:ss`.
fn normalized_time(time: &str) -> Result<(NaiveTime, String)> {
    let parsed = parse_wall_clock(time)?;
    Ok((parsed, parsed.format(TIME_FORMAT).to_string()))
}

fn normalized_date(date: &str) -> Result<(NaiveDate, String)> {
    let parsed = parse_civil_date(date)?;
    Ok((parsed, parsed.format(DATE_FORMAT).to_string()))
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(ScheduleError::Validation(
            "post content must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn reject_past_date(date: NaiveDate, ctx: &EditorContext) -> Result<()> {
    let today = civil_today(ctx.now, &ctx.local_timezone)?;
    if date < today {
        return Err(ScheduleError::Validation(format!(
            "cannot schedule on {}, which is before {}",
            date, today
        )));
    }
    Ok(())
}

impl<S: ScheduleStore + ?Sized> PostLifecycleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load(&self, id: &PostId) -> Result<ScheduledPost> {
        self.store
            .post(id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))
    }

    // ── create ──────────────────────────────────────────────────────────

    /// Validate `input` and build the optimistic post, without persisting it.
    ///
    /// The target timezone, handle, display name and avatar come from the
    /// user's connected account for the chosen channel. The post starts
    /// armed: `schedule_status = true`, `sent_post = false`.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::Validation`] for empty content or a date before
    ///   today in the editor's zone
    /// - [`ScheduleError::MalformedTimeInput`] for an unparseable date or time
    /// - [`ScheduleError::Authorization`] when no account is connected for the channel
    pub async fn prepare_create(
        &self,
        input: NewPostInput,
        ctx: &EditorContext,
    ) -> Result<PendingCreate> {
        validate_content(&input.full_content)?;
        let (date, content_date) = normalized_date(&input.content_date)?;
        let (_, content_time) = normalized_time(&input.content_time)?;
        reject_past_date(date, ctx)?;

        let account = self
            .store
            .channel_account(&input.user_id, input.social_channel)
            .await?
            .ok_or_else(|| {
                ScheduleError::Authorization(format!(
                    "no {} account connected for user {}",
                    input.social_channel, input.user_id
                ))
            })?;
        parse_timezone(&account.timezone)?;

        let tentative = ScheduledPost {
            id: PostId::tentative(),
            user_id: input.user_id,
            content_date,
            content_time,
            target_timezone: account.timezone,
            social_channel: input.social_channel,
            user_handle: account.handle,
            user_display_name: account.display_name,
            avatar_url: account.avatar_url,
            full_content: input.full_content,
            photo_url: input.photo_url,
            video_url: input.video_url,
            schedule_status: true,
            draft_status: false,
            sent_post: false,
            posted_at: None,
            social_post_id: None,
            error_message: None,
            dispatch_token: None,
            dispatch_claimed_at: None,
            revision: 0,
        };
        debug!(post_id = %tentative.id, "prepared post");
        Ok(PendingCreate { tentative })
    }

    /// Persist a prepared post. The stored record carries the store-issued id.
    pub async fn commit_create(&self, pending: &PendingCreate) -> Result<ScheduledPost> {
        let stored = self.store.insert_post(pending.tentative.clone()).await?;
        info!(
            post_id = %stored.id,
            channel = %stored.social_channel,
            date = %stored.content_date,
            time = %stored.content_time,
            "created post"
        );
        Ok(stored)
    }

    pub async fn create(&self, input: NewPostInput, ctx: &EditorContext) -> Result<ScheduledPost> {
        let pending = self.prepare_create(input, ctx).await?;
        self.commit_create(&pending).await
    }

    /// Create against an optimistic board.
    ///
    /// Validation failures leave the board unchanged. Otherwise the tentative
    /// post is added, then replaced by the stored record on success or
    /// removed again on a persistence failure.
    pub async fn create_optimistic(
        &self,
        board: &ScheduleBoard,
        input: NewPostInput,
        ctx: &EditorContext,
    ) -> (ScheduleBoard, Result<ScheduledPost>) {
        let pending = match self.prepare_create(input, ctx).await {
            Ok(pending) => pending,
            Err(e) => return (board.clone(), Err(e)),
        };
        let optimistic = board.apply(BoardEvent::Added(pending.tentative.clone()));

        match self.commit_create(&pending).await {
            Ok(stored) => {
                let confirmed = optimistic.apply(BoardEvent::Confirmed {
                    tentative: pending.tentative.id.clone(),
                    post: stored.clone(),
                });
                (confirmed, Ok(stored))
            }
            Err(e) => {
                warn!(error = %e, "create failed, rolling back optimistic entry");
                let rolled_back = match pending.tentative.slot_key() {
                    Ok(key) => optimistic.apply(BoardEvent::Removed {
                        key,
                        id: pending.tentative.id.clone(),
                    }),
                    Err(_) => board.clone(),
                };
                (rolled_back, Err(e))
            }
        }
    }

    // ── update / reschedule ─────────────────────────────────────────────

    /// Load the post and compute its edited form, without persisting it.
    ///
    /// Returns `(previous, updated)`.
    async fn prepare_update(
        &self,
        id: &PostId,
        patch: &PostPatch,
        ctx: &EditorContext,
    ) -> Result<(ScheduledPost, ScheduledPost)> {
        let previous = self.load(id).await?;
        if previous.is_terminal() {
            return Err(ScheduleError::AlreadySent(id.to_string()));
        }

        let mut updated = previous.clone();
        patch.apply_to(&mut updated);
        validate_content(&updated.full_content)?;
        let (date, content_date) = normalized_date(&updated.content_date)?;
        let (_, content_time) = normalized_time(&updated.content_time)?;
        if patch.content_date.is_some() {
            reject_past_date(date, ctx)?;
        }
        updated.content_date = content_date;
        updated.content_time = content_time;
        Ok((previous, updated))
    }

    /// Edit an unsent post. `target_timezone` is never changed here.
    ///
    /// Dispatch bookkeeping written meanwhile (token, claim, error) is kept:
    /// the patch is reapplied to the current record until a write lands.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::AlreadySent`] once the post is sent, and
    /// [`ScheduleError::Conflict`] if the record kept changing.
    pub async fn update(
        &self,
        id: &PostId,
        patch: PostPatch,
        ctx: &EditorContext,
    ) -> Result<ScheduledPost> {
        for attempt in 1..=EDIT_ATTEMPTS {
            let (previous, updated) = self.prepare_update(id, &patch, ctx).await?;
            match self.write_edit(&previous, &updated).await {
                Err(ScheduleError::Conflict(_)) => {
                    debug!(post_id = %id, attempt, "post changed during edit, reapplying");
                }
                Ok(stored) => {
                    debug!(post_id = %stored.id, "updated post");
                    return Ok(stored);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ScheduleError::Conflict(format!(
            "post {} kept changing during the edit",
            id
        )))
    }

    /// Write `updated` only if the record is still the unsent `previous`.
    async fn write_edit(
        &self,
        previous: &ScheduledPost,
        updated: &ScheduledPost,
    ) -> Result<ScheduledPost> {
        self.store
            .update_post(updated, UpdateGuard::unsent().at_revision(previous.revision))
            .await
    }

    /// Move an unsent post to a new date and time.
    pub async fn reschedule(
        &self,
        id: &PostId,
        new_date: &str,
        new_time: &str,
        ctx: &EditorContext,
    ) -> Result<ScheduledPost> {
        self.update(id, PostPatch::reschedule(new_date, new_time), ctx)
            .await
    }

    /// Update against an optimistic board, restoring the previous entry on failure.
    pub async fn update_optimistic(
        &self,
        board: &ScheduleBoard,
        id: &PostId,
        patch: PostPatch,
        ctx: &EditorContext,
    ) -> (ScheduleBoard, Result<ScheduledPost>) {
        let (previous, updated) = match self.prepare_update(id, &patch, ctx).await {
            Ok(pair) => pair,
            Err(e) => return (board.clone(), Err(e)),
        };
        let optimistic = board.apply(BoardEvent::Replaced(updated.clone()));

        match self.write_edit(&previous, &updated).await {
            Ok(stored) => {
                let confirmed = optimistic.apply(BoardEvent::Replaced(stored.clone()));
                (confirmed, Ok(stored))
            }
            Err(e) => {
                warn!(post_id = %id, error = %e, "update failed, restoring previous entry");
                (optimistic.apply(BoardEvent::Replaced(previous)), Err(e))
            }
        }
    }

    // ── copy / delete ───────────────────────────────────────────────────

    /// Duplicate a post as a fresh draft.
    ///
    /// Content, slot, channel and target timezone are kept. The copy gets a
    /// new id, is unsent and disarmed, and carries no outcome fields.
    pub async fn copy(&self, id: &PostId) -> Result<ScheduledPost> {
        let original = self.load(id).await?;
        let mut copy = original.clone();
        copy.id = PostId::tentative();
        copy.sent_post = false;
        copy.set_armed(false);
        copy.posted_at = None;
        copy.social_post_id = None;
        copy.error_message = None;
        copy.dispatch_token = None;
        copy.dispatch_claimed_at = None;

        let stored = self.store.insert_post(copy).await?;
        info!(source = %id, post_id = %stored.id, "copied post");
        Ok(stored)
    }

    /// Hard-delete a post. Deleting an absent id succeeds.
    pub async fn delete(&self, id: &PostId) -> Result<()> {
        if self.store.delete_post(id).await? {
            info!(post_id = %id, "deleted post");
        } else {
            debug!(post_id = %id, "delete of absent post");
        }
        Ok(())
    }

    // ── pause / activate ────────────────────────────────────────────────

    async fn set_armed(&self, id: &PostId, armed: bool) -> Result<ScheduledPost> {
        for attempt in 1..=EDIT_ATTEMPTS {
            let previous = self.load(id).await?;
            if previous.is_terminal() {
                debug!(post_id = %id, armed, "post already sent, ignoring toggle");
                return Ok(previous);
            }
            let mut toggled = previous.clone();
            toggled.set_armed(armed);
            match self.write_edit(&previous, &toggled).await {
                Err(ScheduleError::Conflict(_)) => {
                    debug!(post_id = %id, attempt, "post changed during toggle, reapplying");
                }
                Ok(stored) => {
                    debug!(post_id = %id, armed, "toggled dispatch");
                    return Ok(stored);
                }
                Err(e) => return Err(e),
            }
        }
        Err(ScheduleError::Conflict(format!(
            "post {} kept changing during the toggle",
            id
        )))
    }

    /// Disarm automatic dispatch. No-op once the post is sent.
    pub async fn pause(&self, id: &PostId) -> Result<ScheduledPost> {
        self.set_armed(id, false).await
    }

    /// Arm automatic dispatch. No-op once the post is sent.
    pub async fn activate(&self, id: &PostId) -> Result<ScheduledPost> {
        self.set_armed(id, true).await
    }

    // ── availability editing ────────────────────────────────────────────

    /// Switch a whole weekday on or off for a user.
    pub async fn set_day_active(&self, user_id: &str, day: DayOfWeek, active: bool) -> Result<()> {
        let rules = self.store.availability_rules(user_id).await?;
        let updated = availability::set_day_active(&rules, day, active);
        self.store.replace_availability_rules(user_id, updated).await
    }

    /// Switch a single weekly slot on or off for a user.
    pub async fn set_slot_active(
        &self,
        user_id: &str,
        day: DayOfWeek,
        time: &str,
        active: bool,
    ) -> Result<()> {
        let time = parse_wall_clock(time)?;
        let rules = self.store.availability_rules(user_id).await?;
        let updated = availability::set_slot_active(&rules, day, time, active);
        self.store.replace_availability_rules(user_id, updated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelAccount;
    use crate::store::{MemoryStore, PostFilter};

    fn ctx() -> EditorContext {
        let now = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        EditorContext::new(now, "America/New_York")
    }

    fn account() -> ChannelAccount {
        ChannelAccount {
            user_id: "u1".to_string(),
            channel: SocialChannel::Bluesky,
            handle: "alice.bsky.social".to_string(),
            display_name: "Alice".to_string(),
            avatar_url: Some("https://cdn.example/alice.png".to_string()),
            timezone: "Europe/Berlin".to_string(),
            credentials: None,
        }
    }

    fn input(date: &str, time: &str) -> NewPostInput {
        NewPostInput {
            user_id: "u1".to_string(),
            social_channel: SocialChannel::Bluesky,
            content_date: date.to_string(),
            content_time: time.to_string(),
            full_content: "launch day".to_string(),
            photo_url: None,
            video_url: None,
        }
    }

    async fn manager() -> PostLifecycleManager<MemoryStore> {
        let store = MemoryStore::new();
        store.add_channel_account(account()).await;
        PostLifecycleManager::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_create_takes_timezone_from_channel() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:30"), &ctx()).await.unwrap();
        assert_eq!(post.target_timezone, "Europe/Berlin");
        assert_eq!(post.content_time, "09:30:00");
        assert_eq!(post.user_handle, "alice.bsky.social");
        assert!(post.schedule_status);
        assert!(!post.draft_status);
        assert!(!post.sent_post);
        assert!(!post.id.is_tentative());
    }

    #[tokio::test]
    async fn test_create_rejects_past_date_in_editor_zone() {
        let m = manager().await;
        let result = m.create(input("2025-05-31", "09:00:00"), &ctx()).await;
        assert!(matches!(result, Err(ScheduleError::Validation(_))));
        // today in the editor's zone is fine
        assert!(m.create(input("2025-06-01", "23:00:00"), &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let m = manager().await;
        let mut bad = input("2025-06-02", "09:00:00");
        bad.full_content = "   ".to_string();
        let result = m.create(bad, &ctx()).await;
        assert!(matches!(result, Err(ScheduleError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_without_account_is_authorization_error() {
        let m = PostLifecycleManager::new(Arc::new(MemoryStore::new()));
        let result = m.create(input("2025-06-02", "09:00:00"), &ctx()).await;
        assert!(matches!(result, Err(ScheduleError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_prepare_returns_tentative_before_persisting() {
        let m = manager().await;
        let pending = m.prepare_create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        assert!(pending.tentative.id.is_tentative());
        let stored = m.store().posts(&PostFilter::default()).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_create_optimistic_rolls_back_on_persistence_failure() {
        let m = manager().await;
        let before = ScheduleBoard::default();
        m.store().set_fail_writes(true);
        let (after, result) = m
            .create_optimistic(&before, input("2025-06-02", "09:00:00"), &ctx())
            .await;
        assert!(matches!(result, Err(ScheduleError::Persistence(_))));
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_create_optimistic_confirms_on_success() {
        let m = manager().await;
        let (after, result) = m
            .create_optimistic(&ScheduleBoard::default(), input("2025-06-02", "09:00:00"), &ctx())
            .await;
        let stored = result.unwrap();
        assert!(!after.has_tentative());
        assert_eq!(after.get(&stored.id), Some(&stored));
    }

    #[tokio::test]
    async fn test_update_keeps_target_timezone() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        let patch = PostPatch {
            full_content: Some("edited".to_string()),
            photo_url: Some(Some("https://cdn.example/p.png".to_string())),
            ..Default::default()
        };
        let updated = m.update(&post.id, patch, &ctx()).await.unwrap();
        assert_eq!(updated.full_content, "edited");
        assert_eq!(updated.target_timezone, "Europe/Berlin");
        assert!(updated.photo_url.is_some());
    }

    #[tokio::test]
    async fn test_reschedule_moves_slot() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        let moved = m.reschedule(&post.id, "2025-06-03", "17:45", &ctx()).await.unwrap();
        assert_eq!(moved.slot_key().unwrap().as_str(), "2025-06-03_17:45");
    }

    #[tokio::test]
    async fn test_sent_post_is_immutable() {
        let m = manager().await;
        let mut post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        post.sent_post = true;
        post.set_armed(false);
        m.store().update_post(&post, UpdateGuard::none()).await.unwrap();

        let update = m
            .update(&post.id, PostPatch { full_content: Some("x".to_string()), ..Default::default() }, &ctx())
            .await;
        assert!(matches!(update, Err(ScheduleError::AlreadySent(_))));

        let activated = m.activate(&post.id).await.unwrap();
        assert!(!activated.schedule_status);
        assert!(activated.sent_post);
        let paused = m.pause(&post.id).await.unwrap();
        assert_eq!(paused, activated);
    }

    #[tokio::test]
    async fn test_update_optimistic_restores_previous_on_failure() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        let before = ScheduleBoard::new(vec![post.clone()]);
        m.store().set_fail_writes(true);
        let (after, result) = m
            .update_optimistic(&before, &post.id, PostPatch::reschedule("2025-06-04", "10:00"), &ctx())
            .await;
        assert!(result.is_err());
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_copy_resets_lifecycle() {
        let m = manager().await;
        let mut post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        post.sent_post = true;
        post.set_armed(false);
        post.posted_at = Some(ctx().now);
        post.social_post_id = Some("at://remote/1".to_string());
        m.store().update_post(&post, UpdateGuard::none()).await.unwrap();

        let copy = m.copy(&post.id).await.unwrap();
        assert_ne!(copy.id, post.id);
        assert!(!copy.sent_post);
        assert!(!copy.schedule_status);
        assert!(copy.draft_status);
        assert!(copy.posted_at.is_none());
        assert!(copy.social_post_id.is_none());
        assert_eq!(copy.full_content, post.full_content);
        assert_eq!(copy.content_date, post.content_date);
        assert_eq!(copy.content_time, post.content_time);
        assert_eq!(copy.target_timezone, post.target_timezone);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        m.delete(&post.id).await.unwrap();
        m.delete(&post.id).await.unwrap();
        assert!(m.store().post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pause_and_activate_keep_flags_in_lockstep() {
        let m = manager().await;
        let post = m.create(input("2025-06-02", "09:00:00"), &ctx()).await.unwrap();
        let paused = m.pause(&post.id).await.unwrap();
        assert!(!paused.schedule_status);
        assert!(paused.draft_status);
        let active = m.activate(&post.id).await.unwrap();
        assert!(active.schedule_status);
        assert!(!active.draft_status);
    }

    #[tokio::test]
    async fn test_slot_toggle_persists_rules() {
        let m = manager().await;
        m.set_slot_active("u1", DayOfWeek::Monday, "09:00", false).await.unwrap();
        let rules = m.store().availability_rules("u1").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].active_time);

        m.set_day_active("u1", DayOfWeek::Monday, false).await.unwrap();
        let rules = m.store().availability_rules("u1").await.unwrap();
        assert!(!availability::is_day_active(DayOfWeek::Monday, &rules));
    }
}
