//! Weekly availability: which days and time slots accept posts.
//!
//! Two layers of toggles apply. A day is switched off only when every rule
//! configured for it has `active_day == false`; that dominates everything
//! else on the day. Otherwise an individual slot is off only when a rule for
//! that exact `(day, HH:mm)` has `active_time == false`. Absence of a rule is
//! never a restriction.
//!
//! The editing helpers return new rule lists instead of mutating in place.

use chrono::{NaiveTime, Timelike};
use tracing::debug;

use crate::model::{AvailabilityRule, DayOfWeek};
use crate::temporal::SLOT_TIME_FORMAT;

fn rules_for(day: DayOfWeek, rules: &[AvailabilityRule]) -> impl Iterator<Item = &AvailabilityRule> {
    rules.iter().filter(move |rule| rule.day_of_week == day)
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

/// Whether posts may be scheduled on `day` at all.
///
/// True when no rule exists for the day, or when at least one of its rules
/// has `active_day` set.
pub fn is_day_active(day: DayOfWeek, rules: &[AvailabilityRule]) -> bool {
    let mut day_rules = rules_for(day, rules).peekable();
    if day_rules.peek().is_none() {
        return true;
    }
    day_rules.any(|rule| rule.active_day)
}

/// Whether the slot `(day, time)` accepts posts.
///
/// Day-level inactivity wins. Otherwise the slot is inactive only if a rule
/// for the same day and minute has `active_time == false`; seconds are
/// ignored when matching.
pub fn is_slot_active(day: DayOfWeek, time: NaiveTime, rules: &[AvailabilityRule]) -> bool {
    if !is_day_active(day, rules) {
        return false;
    }
    !rules_for(day, rules).any(|rule| same_minute(rule.time_of_day, time) && !rule.active_time)
}

/// Switch a whole day on or off by setting `active_day` on every rule of that day.
///
/// A day without rules is already active; switching it on is a no-op, and
/// switching it off has nothing to record, so the rules come back unchanged.
pub fn set_day_active(
    rules: &[AvailabilityRule],
    day: DayOfWeek,
    active: bool,
) -> Vec<AvailabilityRule> {
    debug!(day = %day, active, "toggling day");
    rules
        .iter()
        .cloned()
        .map(|mut rule| {
            if rule.day_of_week == day {
                rule.active_day = active;
            }
            rule
        })
        .collect()
}

/// Switch a single slot on or off.
///
/// Updates every rule matching the day and minute. When none exists a new
/// rule is appended, inheriting the day's current `active_day` state.
pub fn set_slot_active(
    rules: &[AvailabilityRule],
    day: DayOfWeek,
    time: NaiveTime,
    active: bool,
) -> Vec<AvailabilityRule> {
    debug!(day = %day, time = %time.format(SLOT_TIME_FORMAT), active, "toggling slot");
    let mut matched = false;
    let mut updated: Vec<AvailabilityRule> = rules
        .iter()
        .cloned()
        .map(|mut rule| {
            if rule.day_of_week == day && same_minute(rule.time_of_day, time) {
                rule.active_time = active;
                matched = true;
            }
            rule
        })
        .collect();

    if !matched {
        updated.push(AvailabilityRule {
            day_of_week: day,
            time_of_day: time,
            active_day: is_day_active(day, rules),
            active_time: active,
        });
    }
    updated
}
