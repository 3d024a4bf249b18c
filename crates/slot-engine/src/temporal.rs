//! Wall-clock and timezone resolution for scheduled posts.
//!
//! Posts and availability rules store literal wall-clock strings with no
//! offset attached. This module pairs those strings with a named IANA zone
//! to obtain an absolute instant, and renders instants back into any zone
//! for display. All functions take explicit inputs (no system clock
//! access); the caller provides the "now" anchor when needed.
//!
//! # Functions
//!
//! - [`to_absolute_instant`]: civil date + wall-clock time + zone → UTC instant
//! - [`resolve_local`]: the same, reporting how DST gaps and overlaps were settled
//! - [`format_in_zone`]: UTC instant → formatted wall-clock string in a zone
//! - [`shift_instant`]: pure minute offset
//! - [`local_now`] / [`civil_today`]: the "now" anchor seen from a zone
//! - [`render_in_zone_or_raw`]: display conversion that falls back to the raw string
//!
//! # DST handling
//!
//! An instant always maps to exactly one local time. The reverse can fail:
//! during a spring-forward gap a wall-clock time does not exist, and during
//! a fall-back overlap it exists twice. Overlaps resolve to the earlier
//! instant. Gaps are read with the offset in force before the transition,
//! which moves the time forward by the length of the gap
//! (`02:30` on a US spring-forward date becomes `03:30` daylight time).

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::error::{Result, ScheduleError};

/// Civil date format of stored posts (`2025-06-01`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Full wall-clock format of stored times (`14:00:00`).
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Minute-truncated format used for slot keys (`14:00`).
pub const SLOT_TIME_FORMAT: &str = "%H:%M";

// ── Parsing ─────────────────────────────────────────────────────────────────

/// Parse an IANA timezone name into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::MalformedTimeInput(format!("unknown timezone '{}'", s)))
}

/// Parse a `YYYY-MM-DD` civil date.
pub fn parse_civil_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| ScheduleError::MalformedTimeInput(format!("date '{}': {}", s, e)))
}

/// Parse a wall-clock time, either `HH:mm:ss` or `HH:mm`.
pub fn parse_wall_clock(s: &str) -> Result<NaiveTime> {
    let trimmed = s.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, SLOT_TIME_FORMAT))
        .map_err(|e| ScheduleError::MalformedTimeInput(format!("time '{}': {}", s, e)))
}

// ── to_absolute_instant ─────────────────────────────────────────────────────

/// How a local wall-clock time was mapped onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disambiguation {
    /// The local time exists exactly once.
    Exact,
    /// The local time falls in a fall-back overlap; the earlier instant was used.
    Ambiguous,
    /// The local time falls in a spring-forward gap; it was shifted forward.
    Skipped,
}

/// A wall-clock time resolved against a zone.
#[derive(Debug, Clone, Serialize)]
pub struct LocalResolution {
    /// The absolute instant.
    pub instant: DateTime<Utc>,
    /// The instant in the source zone (RFC 3339 with offset).
    pub local: String,
    /// The UTC offset in force at the instant (e.g., "-04:00").
    pub utc_offset: String,
    pub disambiguation: Disambiguation,
}

/// Interpret a civil date and wall-clock time as local time in `timezone`.
///
/// # Errors
///
/// Returns [`ScheduleError::MalformedTimeInput`] if the date, time, or zone
/// cannot be parsed. DST gaps and overlaps never fail; see [`resolve_local`].
///
/// # Examples
///
/// ```
/// use slot_engine::temporal::to_absolute_instant;
///
/// let instant = to_absolute_instant("2025-06-01", "14:00:00", "America/New_York").unwrap();
/// // June is EDT (UTC-4)
/// assert_eq!(instant.to_rfc3339(), "2025-06-01T18:00:00+00:00");
/// ```
pub fn to_absolute_instant(date: &str, time: &str, timezone: &str) -> Result<DateTime<Utc>> {
    resolve_local(date, time, timezone).map(|resolution| resolution.instant)
}

/// Like [`to_absolute_instant`], but also reports the DST disambiguation applied.
pub fn resolve_local(date: &str, time: &str, timezone: &str) -> Result<LocalResolution> {
    let tz = parse_timezone(timezone)?;
    let naive = parse_civil_date(date)?.and_time(parse_wall_clock(time)?);
    let (local, disambiguation) = resolve_naive(naive, &tz);

    Ok(LocalResolution {
        instant: local.with_timezone(&Utc),
        local: local.to_rfc3339(),
        utc_offset: format_utc_offset(&local),
        disambiguation,
    })
}

fn resolve_naive(naive: NaiveDateTime, tz: &Tz) -> (DateTime<Tz>, Disambiguation) {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => (dt, Disambiguation::Exact),
        LocalResult::Ambiguous(earliest, _) => (earliest, Disambiguation::Ambiguous),
        LocalResult::None => {
            // Transitions are never less than a day apart, so the offset a
            // day earlier is the one in force just before the gap.
            let before = tz
                .offset_from_utc_datetime(&(naive - chrono::Duration::days(1)))
                .fix();
            let utc = naive - chrono::Duration::seconds(i64::from(before.local_minus_utc()));
            (tz.from_utc_datetime(&utc), Disambiguation::Skipped)
        }
    }
}

// ── format_in_zone ──────────────────────────────────────────────────────────

/// Format an instant as wall-clock time in `timezone` using a strftime `pattern`.
///
/// # Errors
///
/// Returns [`ScheduleError::MalformedTimeInput`] for an unknown zone or an
/// invalid pattern.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slot_engine::temporal::format_in_zone;
///
/// let instant = Utc.with_ymd_and_hms(2025, 1, 15, 14, 0, 0).unwrap();
/// assert_eq!(format_in_zone(instant, "Asia/Tokyo", "%H:%M:%S").unwrap(), "23:00:00");
/// ```
pub fn format_in_zone(instant: DateTime<Utc>, timezone: &str, pattern: &str) -> Result<String> {
    let tz = parse_timezone(timezone)?;
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ScheduleError::MalformedTimeInput(format!(
            "format pattern '{}'",
            pattern
        )));
    }
    Ok(instant.with_timezone(&tz).format(pattern).to_string())
}

// ── Instant helpers ─────────────────────────────────────────────────────────

/// Offset an instant by a number of minutes (negative moves backwards).
pub fn shift_instant(instant: DateTime<Utc>, delta_minutes: i64) -> DateTime<Utc> {
    instant + chrono::Duration::minutes(delta_minutes)
}

/// The wall-clock date and time of `now` as seen in `timezone`.
pub fn local_now(now: DateTime<Utc>, timezone: &str) -> Result<NaiveDateTime> {
    let tz = parse_timezone(timezone)?;
    Ok(now.with_timezone(&tz).naive_local())
}

/// The civil date of `now` as seen in `timezone`.
pub fn civil_today(now: DateTime<Utc>, timezone: &str) -> Result<NaiveDate> {
    local_now(now, timezone).map(|local| local.date())
}

/// Render a post's stored wall-clock time in a viewer's zone.
///
/// The stored `(date, time)` pair is read in `source_timezone` and formatted
/// in `viewer_timezone`. Any [`ScheduleError::MalformedTimeInput`] falls back
/// to the raw stored time string, so display never fails.
pub fn render_in_zone_or_raw(
    date: &str,
    time: &str,
    source_timezone: &str,
    viewer_timezone: &str,
    pattern: &str,
) -> String {
    match to_absolute_instant(date, time, source_timezone)
        .and_then(|instant| format_in_zone(instant, viewer_timezone, pattern))
    {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!(date, time, source_timezone, viewer_timezone, error = %e, "rendering raw time");
            time.to_string()
        }
    }
}

/// Format the UTC offset as a string (e.g., "-05:00", "+09:00").
fn format_utc_offset<T: TimeZone>(dt: &DateTime<T>) -> String {
    let offset_secs = dt.offset().fix().local_minus_utc();
    let sign = if offset_secs >= 0 { "+" } else { "-" };
    let abs_secs = offset_secs.unsigned_abs();
    let hours = abs_secs / 3600;
    let minutes = (abs_secs % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ── to_absolute_instant ─────────────────────────────────────────────

    #[test]
    fn test_instant_in_eastern_summer() {
        let instant = to_absolute_instant("2025-06-01", "14:00:00", "America/New_York").unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-06-01T18:00:00+00:00");
    }

    #[test]
    fn test_instant_in_eastern_winter() {
        let instant = to_absolute_instant("2025-01-15", "09:00:00", "America/New_York").unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-01-15T14:00:00+00:00");
    }

    #[test]
    fn test_instant_accepts_minute_precision() {
        let instant = to_absolute_instant("2025-01-15", "09:00", "UTC").unwrap();
        assert_eq!(instant.to_rfc3339(), "2025-01-15T09:00:00+00:00");
    }

    #[test]
    fn test_spring_forward_gap_shifts_forward() {
        // 2025-03-09 02:30 does not exist in New York; read as EST it lands at 03:30 EDT
        let resolution = resolve_local("2025-03-09", "02:30:00", "America/New_York").unwrap();
        assert_eq!(resolution.disambiguation, Disambiguation::Skipped);
        assert_eq!(resolution.instant.to_rfc3339(), "2025-03-09T07:30:00+00:00");
        assert_eq!(resolution.utc_offset, "-04:00");
        assert!(resolution.local.contains("03:30:00"));
    }

    #[test]
    fn test_spring_forward_gap_is_deterministic() {
        let first = to_absolute_instant("2025-03-09", "02:30:00", "America/New_York").unwrap();
        let second = to_absolute_instant("2025-03-09", "02:30:00", "America/New_York").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fall_back_overlap_uses_earlier_instant() {
        // 2025-11-02 01:30 happens twice in New York; the EDT reading comes first
        let resolution = resolve_local("2025-11-02", "01:30:00", "America/New_York").unwrap();
        assert_eq!(resolution.disambiguation, Disambiguation::Ambiguous);
        assert_eq!(resolution.instant.to_rfc3339(), "2025-11-02T05:30:00+00:00");
        assert_eq!(resolution.utc_offset, "-04:00");
    }

    #[test]
    fn test_exact_resolution_reports_offset() {
        let resolution = resolve_local("2025-06-01", "12:00:00", "Asia/Kolkata").unwrap();
        assert_eq!(resolution.disambiguation, Disambiguation::Exact);
        assert_eq!(resolution.utc_offset, "+05:30");
    }

    #[test]
    fn test_invalid_timezone_is_malformed() {
        let result = to_absolute_instant("2025-06-01", "14:00:00", "Mars/Olympus_Mons");
        assert!(matches!(result, Err(ScheduleError::MalformedTimeInput(_))));
    }

    #[test]
    fn test_invalid_time_is_malformed() {
        for bad in ["25:00:00", "noon", "", "14-00-00"] {
            let result = to_absolute_instant("2025-06-01", bad, "UTC");
            assert!(
                matches!(result, Err(ScheduleError::MalformedTimeInput(_))),
                "expected error for '{}'",
                bad
            );
        }
    }

    #[test]
    fn test_invalid_date_is_malformed() {
        let result = to_absolute_instant("2025-02-30", "14:00:00", "UTC");
        assert!(matches!(result, Err(ScheduleError::MalformedTimeInput(_))));
    }

    // ── format_in_zone ──────────────────────────────────────────────────

    #[test]
    fn test_format_converts_between_zones() {
        let instant = to_absolute_instant("2025-06-01", "14:00:00", "America/New_York").unwrap();
        assert_eq!(
            format_in_zone(instant, "America/Los_Angeles", TIME_FORMAT).unwrap(),
            "11:00:00"
        );
        assert_eq!(
            format_in_zone(instant, "Europe/London", "%Y-%m-%d %H:%M").unwrap(),
            "2025-06-01 19:00"
        );
    }

    #[test]
    fn test_format_rejects_bad_pattern() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let result = format_in_zone(instant, "UTC", "%Q");
        assert!(matches!(result, Err(ScheduleError::MalformedTimeInput(_))));
    }

    #[test]
    fn test_format_rejects_bad_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(format_in_zone(instant, "Nowhere", TIME_FORMAT).is_err());
    }

    // ── helpers ─────────────────────────────────────────────────────────

    #[test]
    fn test_shift_instant_both_directions() {
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 30).unwrap();
        assert_eq!(
            shift_instant(instant, -1).to_rfc3339(),
            "2025-05-31T23:59:30+00:00"
        );
        assert_eq!(
            shift_instant(instant, 90).to_rfc3339(),
            "2025-06-01T01:30:30+00:00"
        );
    }

    #[test]
    fn test_civil_today_depends_on_zone() {
        // 02:00 UTC on June 2 is still June 1 in Los Angeles
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 2, 0, 0).unwrap();
        assert_eq!(civil_today(now, "UTC").unwrap().to_string(), "2025-06-02");
        assert_eq!(
            civil_today(now, "America/Los_Angeles").unwrap().to_string(),
            "2025-06-01"
        );
    }

    #[test]
    fn test_render_converts_for_viewer() {
        let rendered = render_in_zone_or_raw(
            "2025-06-01",
            "14:00:00",
            "America/New_York",
            "Europe/Berlin",
            SLOT_TIME_FORMAT,
        );
        assert_eq!(rendered, "20:00");
    }

    #[test]
    fn test_render_falls_back_to_raw_string() {
        let rendered = render_in_zone_or_raw(
            "2025-06-01",
            "14:00:00",
            "Not/AZone",
            "Europe/Berlin",
            SLOT_TIME_FORMAT,
        );
        assert_eq!(rendered, "14:00:00");
    }

    // ── properties ──────────────────────────────────────────────────────

    const ZONES: [&str; 6] = [
        "UTC",
        "America/New_York",
        "Europe/Berlin",
        "Australia/Sydney",
        "Asia/Kolkata",
        "America/Sao_Paulo",
    ];

    proptest! {
        #[test]
        fn prop_round_trip_outside_transitions(
            days in 0i64..(365 * 20),
            secs in 0u32..86_400,
            zone_idx in 0usize..ZONES.len(),
        ) {
            let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
            let date = (base + chrono::Duration::days(days)).format(DATE_FORMAT).to_string();
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
                .unwrap()
                .format(TIME_FORMAT)
                .to_string();
            let zone = ZONES[zone_idx];

            let resolution = resolve_local(&date, &time, zone).unwrap();
            prop_assume!(resolution.disambiguation == Disambiguation::Exact);
            let rendered = format_in_zone(resolution.instant, zone, TIME_FORMAT).unwrap();
            prop_assert_eq!(rendered, time);
        }

        #[test]
        fn prop_resolution_never_fails_for_valid_input(
            days in 0i64..(365 * 20),
            secs in 0u32..86_400,
            zone_idx in 0usize..ZONES.len(),
        ) {
            let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
            let date = (base + chrono::Duration::days(days)).format(DATE_FORMAT).to_string();
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
                .unwrap()
                .format(TIME_FORMAT)
                .to_string();
            prop_assert!(to_absolute_instant(&date, &time, ZONES[zone_idx]).is_ok());
        }
    }
}
