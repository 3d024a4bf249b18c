//! Per-day slot grid merging weekly availability with scheduled posts.
//!
//! The grid covers a rolling window of civil days starting at "today". Each
//! day lists the union of its recurring rule times and the times of posts
//! dated on it, truncated to `HH:mm`, deduplicated and sorted. Every slot
//! carries the posts keyed to it and its disabled state.
//!
//! Building is a pure projection: the same rules, posts and window always
//! give the same grid. Posts whose date or time cannot be parsed are left
//! out and reported as [`GridWarning`]s instead of failing the build.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;
use tracing::warn;

use crate::availability::{is_day_active, is_slot_active};
use crate::error::Result;
use crate::model::{AvailabilityRule, DayOfWeek, PostId, ScheduledPost, SlotKey};
use crate::temporal::{civil_today, SLOT_TIME_FORMAT};

/// Number of days shown by default, today included.
pub const DEFAULT_WINDOW_DAYS: u32 = 14;

/// One `(day, HH:mm)` cell of the grid.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    /// Slot time, `HH:mm`.
    pub time: String,
    pub key: SlotKey,
    pub is_available: bool,
    pub is_disabled: bool,
    /// Posts keyed to this slot, in input order. Several channels may share a slot.
    pub posts: Vec<ScheduledPost>,
}

/// All slots of one civil day.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub is_disabled_day: bool,
    pub slots: Vec<SlotView>,
}

impl DaySchedule {
    pub fn slot(&self, time: &str) -> Option<&SlotView> {
        self.slots.iter().find(|slot| slot.time == time)
    }
}

/// A post left out of the grid because its stored date or time is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridWarning {
    pub post_id: PostId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotGrid {
    pub days: Vec<DaySchedule>,
    pub warnings: Vec<GridWarning>,
}

impl SlotGrid {
    pub fn day(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.iter().find(|day| day.date == date)
    }

    /// Look a slot up by its `"{YYYY-MM-DD}_{HH:mm}"` key.
    pub fn slot(&self, key: &SlotKey) -> Option<&SlotView> {
        self.days
            .iter()
            .flat_map(|day| day.slots.iter())
            .find(|slot| &slot.key == key)
    }

    /// Every post placed in the grid.
    pub fn posts(&self) -> impl Iterator<Item = &ScheduledPost> {
        self.days
            .iter()
            .flat_map(|day| day.slots.iter())
            .flat_map(|slot| slot.posts.iter())
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Build the grid for `window_days` days starting at `today`.
pub fn build_grid(
    today: NaiveDate,
    window_days: u32,
    rules: &[AvailabilityRule],
    posts: &[ScheduledPost],
) -> SlotGrid {
    let mut warnings = Vec::new();
    let mut posts_by_date: BTreeMap<NaiveDate, Vec<(NaiveTime, &ScheduledPost)>> = BTreeMap::new();

    for post in posts {
        match post
            .civil_date()
            .and_then(|date| post.civil_time().map(|time| (date, time)))
        {
            Ok((date, time)) => posts_by_date
                .entry(date)
                .or_default()
                .push((truncate_to_minute(time), post)),
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "excluding post with malformed date or time");
                warnings.push(GridWarning {
                    post_id: post.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let days = today
        .iter_days()
        .take(window_days as usize)
        .map(|date| {
            let dated = posts_by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            build_day(date, rules, dated)
        })
        .collect();

    SlotGrid { days, warnings }
}

/// Build the default 14-day grid with "today" taken from `now` in `timezone`.
///
/// # Errors
///
/// Returns [`crate::ScheduleError::MalformedTimeInput`] if `timezone` is unknown.
pub fn build_grid_at(
    now: DateTime<Utc>,
    timezone: &str,
    rules: &[AvailabilityRule],
    posts: &[ScheduledPost],
) -> Result<SlotGrid> {
    let today = civil_today(now, timezone)?;
    Ok(build_grid(today, DEFAULT_WINDOW_DAYS, rules, posts))
}

fn build_day(
    date: NaiveDate,
    rules: &[AvailabilityRule],
    dated: &[(NaiveTime, &ScheduledPost)],
) -> DaySchedule {
    let day_of_week = DayOfWeek::of(date);

    // Zero-padded HH:mm keys sort chronologically as strings.
    let mut slots: BTreeMap<String, (NaiveTime, Vec<ScheduledPost>)> = BTreeMap::new();
    for rule in rules.iter().filter(|rule| rule.day_of_week == day_of_week) {
        let time = truncate_to_minute(rule.time_of_day);
        slots
            .entry(time.format(SLOT_TIME_FORMAT).to_string())
            .or_insert_with(|| (time, Vec::new()));
    }
    for (time, post) in dated {
        slots
            .entry(time.format(SLOT_TIME_FORMAT).to_string())
            .or_insert_with(|| (*time, Vec::new()))
            .1
            .push((*post).clone());
    }

    let slots = slots
        .into_iter()
        .map(|(label, (time, posts))| {
            let is_disabled = !is_slot_active(day_of_week, time, rules);
            SlotView {
                key: SlotKey::from_slot_time(date, &label),
                time: label,
                is_available: !is_disabled,
                is_disabled,
                posts,
            }
        })
        .collect();

    DaySchedule {
        date,
        day_of_week,
        is_disabled_day: !is_day_active(day_of_week, rules),
        slots,
    }
}
