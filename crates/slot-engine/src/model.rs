//! Core record types shared by every scheduling component.
//!
//! Posts keep their civil date and wall-clock time as the literal strings the
//! record store holds. They are parsed on use, so one malformed record can be
//! reported and skipped instead of failing a whole batch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ScheduleError};
use crate::temporal::{parse_civil_date, parse_wall_clock, DATE_FORMAT, SLOT_TIME_FORMAT};

// ── DayOfWeek ───────────────────────────────────────────────────────────────

/// A day of the week, canonicalized lowercase (`"monday"`).
///
/// Parsing is case-insensitive, so `"Monday"` and `"MONDAY"` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// The day of the week a civil date falls on.
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "sunday",
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        DayOfWeek::ALL
            .into_iter()
            .find(|day| day.as_str() == normalized)
            .ok_or_else(|| ScheduleError::Validation(format!("unknown day of week: '{}'", s)))
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── SocialChannel ───────────────────────────────────────────────────────────

/// The external platform a post is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialChannel {
    Bluesky,
    LinkedIn,
    Twitter,
}

impl SocialChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialChannel::Bluesky => "bluesky",
            SocialChannel::LinkedIn => "linkedin",
            SocialChannel::Twitter => "twitter",
        }
    }
}

impl fmt::Display for SocialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialChannel {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bluesky" => Ok(SocialChannel::Bluesky),
            "linkedin" => Ok(SocialChannel::LinkedIn),
            "twitter" | "x" => Ok(SocialChannel::Twitter),
            _ => Err(ScheduleError::Validation(format!(
                "unknown social channel: '{}'",
                s
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for SocialChannel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── AvailabilityRule ────────────────────────────────────────────────────────

/// One recurring weekly slot the user has configured.
///
/// `time_of_day` carries no zone. It is interpreted against a post's target
/// timezone when the slot is used, never when the rule is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub day_of_week: DayOfWeek,
    pub time_of_day: NaiveTime,
    pub active_day: bool,
    pub active_time: bool,
}

impl AvailabilityRule {
    pub fn new(day_of_week: DayOfWeek, time_of_day: NaiveTime) -> Self {
        Self {
            day_of_week,
            time_of_day,
            active_day: true,
            active_time: true,
        }
    }

    /// The rule's time truncated to `HH:mm`.
    pub fn slot_time(&self) -> String {
        self.time_of_day.format(SLOT_TIME_FORMAT).to_string()
    }
}

// ── Identifiers and keys ────────────────────────────────────────────────────

/// Opaque post identifier issued by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

const TENTATIVE_PREFIX: &str = "tmp-";

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        PostId(id.into())
    }

    /// A locally generated id for an optimistic entry not yet confirmed by storage.
    pub fn tentative() -> Self {
        PostId(format!("{}{}", TENTATIVE_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn is_tentative(&self) -> bool {
        self.0.starts_with(TENTATIVE_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `"{YYYY-MM-DD}_{HH:mm}"` key correlating a slot with the posts in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        SlotKey(format!(
            "{}_{}",
            date.format(DATE_FORMAT),
            time.format(SLOT_TIME_FORMAT)
        ))
    }

    /// Build a key from an already truncated `HH:mm` slot time.
    pub fn from_slot_time(date: NaiveDate, slot_time: &str) -> Self {
        SlotKey(format!("{}_{}", date.format(DATE_FORMAT), slot_time))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SlotKey {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let (date, time) = s
            .split_once('_')
            .ok_or_else(|| ScheduleError::MalformedTimeInput(format!("slot key '{}'", s)))?;
        Ok(SlotKey::new(parse_civil_date(date)?, parse_wall_clock(time)?))
    }
}

// ── ScheduledPost ───────────────────────────────────────────────────────────

/// Where a post stands in its lifecycle, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Sent,
    Failed,
}

/// A single unit of content bound to one calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: PostId,
    pub user_id: String,
    /// Civil date, `YYYY-MM-DD`.
    pub content_date: String,
    /// Wall-clock time, `HH:mm:ss`, local to `target_timezone`.
    pub content_time: String,
    /// IANA zone fixed at creation from the channel; never recomputed.
    pub target_timezone: String,
    pub social_channel: SocialChannel,
    pub user_handle: String,
    pub user_display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub full_content: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    pub schedule_status: bool,
    pub draft_status: bool,
    pub sent_post: bool,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub social_post_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Idempotency token recorded before the first publish attempt.
    #[serde(default)]
    pub dispatch_token: Option<String>,
    /// Set while a dispatch attempt holds the post; cleared when it resolves.
    #[serde(default)]
    pub dispatch_claimed_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every update.
    #[serde(default)]
    pub revision: u64,
}

impl ScheduledPost {
    pub fn civil_date(&self) -> Result<NaiveDate> {
        parse_civil_date(&self.content_date)
    }

    pub fn civil_time(&self) -> Result<NaiveTime> {
        parse_wall_clock(&self.content_time)
    }

    /// The post's time truncated to `HH:mm`.
    pub fn slot_time(&self) -> Result<String> {
        Ok(self.civil_time()?.format(SLOT_TIME_FORMAT).to_string())
    }

    pub fn slot_key(&self) -> Result<SlotKey> {
        Ok(SlotKey::new(self.civil_date()?, self.civil_time()?))
    }

    pub fn status(&self) -> PostStatus {
        if self.sent_post {
            PostStatus::Sent
        } else if self.error_message.is_some() {
            PostStatus::Failed
        } else if self.schedule_status {
            PostStatus::Scheduled
        } else {
            PostStatus::Draft
        }
    }

    /// Once sent, a post is immutable to editing and to the dispatcher.
    pub fn is_terminal(&self) -> bool {
        self.sent_post
    }

    /// Arm or disarm automatic dispatch, keeping `draft_status` in lockstep.
    pub(crate) fn set_armed(&mut self, armed: bool) {
        self.schedule_status = armed;
        self.draft_status = !armed;
    }
}

// ── Channel accounts ────────────────────────────────────────────────────────

/// Publish credentials for one connected channel.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A user's connection to one social channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub user_id: String,
    pub channel: SocialChannel,
    pub handle: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// IANA zone that new posts on this channel are scheduled against.
    pub timezone: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}
