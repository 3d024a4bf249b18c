//! Due-window matching and automated dispatch.
//!
//! On each cycle the [`Dispatcher`] loads armed, unsent posts whose
//! `content_date` equals today's date in UTC, and keeps those whose
//! wall-clock time falls inside `[local_now - tolerance, local_now + tolerance]`
//! evaluated in each post's own target timezone. Each due post is then
//! claimed, published and written back:
//!
//! 1. claim: stamp `dispatch_token` and `dispatch_claimed_at` with a write
//!    pinned to the revision just read. Only one writer can move a revision
//!    forward, so of two concurrent attempts exactly one holds the claim and
//!    the other is skipped. A claim younger than
//!    [`DispatchConfig::claim_lease`] also makes later attempts skip.
//! 2. publish through the channel's [`Publisher`] with a per-attempt timeout.
//! 3. merge the outcome onto the freshly loaded record and release the claim.
//!    On success set `sent_post`, clear `schedule_status` and `error_message`,
//!    stamp `posted_at` and `social_post_id`. On failure record
//!    `error_message` and leave the post armed so the next cycle retries it
//!    with the same token.
//!
//! A crash between a successful publish and step 3 can publish twice unless
//! the adapter honours the idempotency key.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;
use crate::error::{Result, ScheduleError};
use crate::model::{Credentials, PostId, ScheduledPost};
use crate::publish::{publish_with_timeout, PublishReceipt, PublishRequest, PublisherRegistry};
use crate::store::{PostFilter, ScheduleStore, UpdateGuard};
use crate::temporal::{local_now, DATE_FORMAT, TIME_FORMAT};

/// Attempts at merging a dispatch outcome when edits keep moving the revision.
const FINISH_ATTEMPTS: usize = 3;

// ── Due window ──────────────────────────────────────────────────────────────

/// Closed local interval `[start, end]` around local now.
///
/// Wall-clock times are matched on `date`, the local date of now. A window
/// that crosses midnight does not wrap: times on the other side of midnight
/// belong to a different day and never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DueWindow {
    /// The window of half-width `tolerance` around `local_now`, at second precision.
    pub fn around(local_now: NaiveDateTime, tolerance: chrono::Duration) -> Self {
        let center = local_now.with_nanosecond(0).unwrap_or(local_now);
        Self {
            date: center.date(),
            start: center.checked_sub_signed(tolerance).unwrap_or(NaiveDateTime::MIN),
            end: center.checked_add_signed(tolerance).unwrap_or(NaiveDateTime::MAX),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let at = self.date.and_time(time);
        self.start <= at && at <= self.end
    }
}

impl fmt::Display for DueWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

/// The due window for `now` as seen from `timezone`.
pub fn due_window(
    now: DateTime<Utc>,
    timezone: &str,
    tolerance: chrono::Duration,
) -> Result<DueWindow> {
    Ok(DueWindow::around(local_now(now, timezone)?, tolerance))
}

/// Whether `post` should be published by a cycle running at `now`.
///
/// The candidate date check compares `content_date` with today's UTC date,
/// not the date in the post's own zone.
pub fn is_due(post: &ScheduledPost, now: DateTime<Utc>, tolerance: chrono::Duration) -> Result<bool> {
    if !post.schedule_status || post.sent_post {
        return Ok(false);
    }
    if post.civil_date()? != now.date_naive() {
        return Ok(false);
    }
    let window = due_window(now, &post.target_timezone, tolerance)?;
    Ok(window.contains(post.civil_time()?))
}

/// The due subset of `posts`. Malformed posts are logged and skipped.
pub fn select_due<'a>(
    posts: &'a [ScheduledPost],
    now: DateTime<Utc>,
    tolerance: chrono::Duration,
) -> Vec<&'a ScheduledPost> {
    posts
        .iter()
        .filter(|post| match is_due(post, now, tolerance) {
            Ok(due) => due,
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "skipping malformed post");
                false
            }
        })
        .collect()
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { remote_id: String },
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub candidates: usize,
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<(PostId, DispatchOutcome)>,
}

impl DispatchReport {
    fn record(&mut self, id: PostId, outcome: DispatchOutcome) {
        match &outcome {
            DispatchOutcome::Sent { .. } => self.sent += 1,
            DispatchOutcome::Failed { .. } => self.failed += 1,
            DispatchOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push((id, outcome));
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────────────

pub struct Dispatcher<S: ScheduleStore + ?Sized> {
    store: Arc<S>,
    publishers: PublisherRegistry,
    config: DispatchConfig,
}

/// A post held by one dispatch attempt.
struct Claim {
    post: ScheduledPost,
    token: String,
    at: DateTime<Utc>,
}

fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn mark_sent(post: &mut ScheduledPost, remote_id: &str, now: DateTime<Utc>) {
    post.sent_post = true;
    post.schedule_status = false;
    post.draft_status = false;
    post.posted_at = Some(now);
    post.social_post_id = Some(remote_id.to_string());
    post.error_message = None;
}

impl<S: ScheduleStore + ?Sized> Dispatcher<S> {
    pub fn new(store: Arc<S>, publishers: PublisherRegistry, config: DispatchConfig) -> Self {
        Self {
            store,
            publishers,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one dispatch cycle as of `now`.
    ///
    /// Only a failure to list candidates is returned as an error; per-post
    /// problems end up in the report.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let today = now.date_naive().format(DATE_FORMAT).to_string();
        let candidates = self
            .store
            .posts(&PostFilter::default().on_date(today).armed())
            .await?;
        let due = select_due(&candidates, now, self.config.tolerance());

        let mut report = DispatchReport {
            candidates: candidates.len(),
            due: due.len(),
            ..Default::default()
        };
        for post in due {
            let outcome = self.dispatch_one(&post.id, now).await;
            report.record(post.id.clone(), outcome);
        }

        info!(
            candidates = report.candidates,
            due = report.due,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "dispatch cycle complete"
        );
        Ok(report)
    }

    async fn dispatch_one(&self, id: &PostId, now: DateTime<Utc>) -> DispatchOutcome {
        let current = match self.store.post(id).await {
            Ok(Some(current)) => current,
            Ok(None) => return skipped(id, "post was deleted"),
            Err(e) => return skipped(id, &e.to_string()),
        };
        if !current.schedule_status || current.sent_post {
            return skipped(id, "post is no longer armed");
        }
        if self.claim_is_live(&current, now) {
            return skipped(id, "post is claimed by another dispatch");
        }
        let claim = match self.claim(current, now, UpdateGuard::armed_unsent()).await {
            Ok(claim) => claim,
            Err(e) => return skipped(id, &e.to_string()),
        };

        let credentials = match self.credentials(&claim.post).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                let message = format!("no {} credentials connected", claim.post.social_channel);
                return self.record_failure(&claim, message, false).await;
            }
            Err(e) => return self.record_failure(&claim, e.detail().to_string(), false).await,
        };

        let receipt = match self.publish(&claim, credentials).await {
            Ok(receipt) => receipt,
            Err(e) => return self.record_failure(&claim, e.detail().to_string(), false).await,
        };
        let recorded = self
            .finish(&claim, |p| mark_sent(p, &receipt.remote_id, now))
            .await;
        match recorded {
            Ok(stored) => {
                info!(
                    post_id = %stored.id,
                    channel = %stored.social_channel,
                    remote_id = %receipt.remote_id,
                    "post sent"
                );
                DispatchOutcome::Sent {
                    remote_id: receipt.remote_id,
                }
            }
            Err(e) => {
                error!(
                    post_id = %id,
                    remote_id = %receipt.remote_id,
                    error = %e,
                    "published but failed to record sent status"
                );
                skipped(
                    id,
                    &format!("published as {} but not recorded: {}", receipt.remote_id, e),
                )
            }
        }
    }

    fn claim_is_live(&self, post: &ScheduledPost, now: DateTime<Utc>) -> bool {
        post.dispatch_claimed_at
            .is_some_and(|at| now - at < self.config.claim_lease())
    }

    /// Take the claim on `post`, reusing its token if a previous attempt left one.
    ///
    /// The write is pinned to `post.revision`; any write since it was read
    /// turns this into [`ScheduleError::Conflict`].
    async fn claim(
        &self,
        mut post: ScheduledPost,
        now: DateTime<Utc>,
        guard: UpdateGuard,
    ) -> Result<Claim> {
        let token = post.dispatch_token.clone().unwrap_or_else(new_token);
        post.dispatch_token = Some(token.clone());
        post.dispatch_claimed_at = Some(now);
        let post = self
            .store
            .update_post(&post, guard.at_revision(post.revision))
            .await?;
        debug!(post_id = %post.id, token = %token, "dispatch claimed");
        Ok(Claim {
            post,
            token,
            at: now,
        })
    }

    async fn credentials(&self, post: &ScheduledPost) -> Result<Option<Credentials>> {
        Ok(self
            .store
            .channel_account(&post.user_id, post.social_channel)
            .await?
            .and_then(|account| account.credentials))
    }

    async fn publish(&self, claim: &Claim, credentials: Credentials) -> Result<PublishReceipt> {
        let channel = claim.post.social_channel;
        let publisher = self.publishers.get(channel).ok_or_else(|| {
            ScheduleError::Publish(format!("no publisher registered for {}", channel))
        })?;
        let request = PublishRequest::for_post(&claim.post, credentials, &claim.token);
        publish_with_timeout(publisher.as_ref(), &request, self.config.publish_timeout()).await
    }

    /// Apply an outcome to the current record and release the claim.
    ///
    /// Edits made while the publish was in flight are kept. Fails with
    /// [`ScheduleError::Conflict`] if the post was sent or re-claimed
    /// meanwhile.
    async fn finish(
        &self,
        claim: &Claim,
        apply: impl Fn(&mut ScheduledPost),
    ) -> Result<ScheduledPost> {
        let id = &claim.post.id;
        for _ in 0..FINISH_ATTEMPTS {
            let mut current = self
                .store
                .post(id)
                .await?
                .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
            if current.sent_post || current.dispatch_claimed_at != Some(claim.at) {
                return Err(ScheduleError::Conflict(format!(
                    "dispatch claim on post {} was lost",
                    id
                )));
            }
            apply(&mut current);
            current.dispatch_claimed_at = None;
            match self
                .store
                .update_post(&current, UpdateGuard::unsent().at_revision(current.revision))
                .await
            {
                Err(ScheduleError::Conflict(_)) => continue,
                result => return result,
            }
        }
        Err(ScheduleError::Conflict(format!(
            "post {} kept changing while recording the dispatch outcome",
            id
        )))
    }

    /// Record `message` on the post and release the claim. `disarm` clears
    /// `schedule_status` and leaves `draft_status` as it was.
    async fn record_failure(&self, claim: &Claim, message: String, disarm: bool) -> DispatchOutcome {
        warn!(post_id = %claim.post.id, error = %message, disarm, "publish failed");
        let recorded = self
            .finish(claim, |post| {
                post.error_message = Some(message.clone());
                if disarm {
                    post.schedule_status = false;
                }
            })
            .await;
        if let Err(e) = recorded {
            error!(post_id = %claim.post.id, error = %e, "failed to record publish failure");
        }
        DispatchOutcome::Failed { error: message }
    }

    /// Publish one post immediately, outside the due window.
    ///
    /// Unlike the automated cycle, a failed attempt disarms the post
    /// (`schedule_status = false`) so it will not be retried automatically.
    /// A token left by an earlier failed attempt is reused.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::NotFound`] / [`ScheduleError::AlreadySent`]
    /// - [`ScheduleError::Authorization`] when the channel has no credentials;
    ///   the post is left unchanged
    /// - [`ScheduleError::Conflict`] when another dispatch holds the post, or
    ///   took it over before the outcome was recorded
    /// - [`ScheduleError::Publish`] when the attempt failed and was recorded
    pub async fn publish_now(&self, id: &PostId, now: DateTime<Utc>) -> Result<ScheduledPost> {
        let post = self
            .store
            .post(id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        if post.is_terminal() {
            return Err(ScheduleError::AlreadySent(id.to_string()));
        }

        let credentials = self.credentials(&post).await?.ok_or_else(|| {
            ScheduleError::Authorization(format!(
                "no {} credentials connected for user {}",
                post.social_channel, post.user_id
            ))
        })?;
        if self.claim_is_live(&post, now) {
            return Err(ScheduleError::Conflict(format!(
                "post {} is being dispatched",
                id
            )));
        }

        let claim = self.claim(post, now, UpdateGuard::unsent()).await?;
        match self.publish(&claim, credentials).await {
            Ok(receipt) => {
                let stored = self
                    .finish(&claim, |p| mark_sent(p, &receipt.remote_id, now))
                    .await?;
                info!(post_id = %stored.id, channel = %stored.social_channel, "post sent manually");
                Ok(stored)
            }
            Err(e) => {
                let message = e.detail().to_string();
                self.record_failure(&claim, message.clone(), true).await;
                Err(ScheduleError::Publish(message))
            }
        }
    }

    /// Run cycles every `cadence_secs` until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.cadence());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(cadence_secs = self.config.cadence_secs, "dispatcher started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle(Utc::now()).await {
                        warn!(error = %e, "dispatch cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("dispatcher stopped");
    }
}

fn skipped(id: &PostId, reason: &str) -> DispatchOutcome {
    debug!(post_id = %id, reason, "skipping post");
    DispatchOutcome::Skipped {
        reason: reason.to_string(),
    }
}
