// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directional window resolver.
//!
//! Turns free-text arrival times into an absolute arrival window, filters
//! provider segments down to candidate threads, and computes how long the
//! resulting search should live.

use crate::models::{CandidateThread, Direction, Route, ScheduleSegment, TravelIntentWindow};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// A window must end at least this far in the future.
const MIN_LEAD_MINUTES: i64 = 5;
/// Grace period a search outlives its arrival window by.
const TTL_GRACE_MINUTES: i64 = 60;
const MIN_TTL_MINUTES: i64 = 60;

static RANGE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:-|–|—|до|to)\s*").expect("valid regex"));
static TIME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{1,2}))?$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("no arrival time given")]
    Empty,

    #[error("unrecognised time {0:?}")]
    InvalidTime(String),

    #[error("{0} does not exist in the local timezone")]
    NonexistentLocalTime(String),
}

/// Parse one time token: `HH:MM`, `HHMM`, or a bare hour.
/// `,` and `.` are accepted as the hour/minute separator.
pub fn parse_time(part: &str) -> Option<NaiveTime> {
    let candidate: String = part
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' || c == '.' { ':' } else { c })
        .collect();
    if candidate.is_empty() {
        return None;
    }

    let (hours, minutes) = if candidate.chars().all(|c| c.is_ascii_digit()) {
        let value: u32 = candidate.parse().ok()?;
        if value >= 2400 {
            return None;
        }
        if value >= 100 {
            (value / 100, value % 100)
        } else {
            (value, 0)
        }
    } else {
        let caps = TIME_TOKEN.captures(&candidate)?;
        let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        (hours, minutes)
    };

    if hours > 23 || minutes > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

fn localize(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Tz>, WindowError> {
    tz.from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| WindowError::NonexistentLocalTime(local.to_string()))
}

/// Resolve free text into an arrival window relative to `now`.
///
/// A single time `T` becomes `[T - tolerance, T + tolerance]`, never
/// starting before local midnight. A range whose end is not after its
/// start crosses midnight. A window ending less than five minutes from
/// now moves forward by calendar days, keeping its wall-clock times
/// across DST changes.
pub fn parse_arrival_window(
    raw: &str,
    now: DateTime<Tz>,
    direction: Direction,
    tolerance_minutes: u32,
) -> Result<TravelIntentWindow, WindowError> {
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(WindowError::Empty);
    }

    let tz = now.timezone();
    let today = now.date_naive();
    let invalid = || WindowError::InvalidTime(raw.trim().to_string());
    let parts: Vec<&str> = RANGE_SEPARATORS.split(&cleaned).collect();

    // Wall-clock bounds; only localized once the day is settled.
    let (mut start, mut end, tolerance) = match parts.as_slice() {
        [single] => {
            let center = today.and_time(parse_time(single).ok_or_else(invalid)?);
            let tolerance = Duration::minutes(i64::from(tolerance_minutes));
            let start = (center - tolerance).max(today.and_time(NaiveTime::MIN));
            (start, center + tolerance, tolerance_minutes)
        }
        [first, second] => {
            let start = today.and_time(parse_time(first).ok_or_else(invalid)?);
            let mut end = today.and_time(parse_time(second).ok_or_else(invalid)?);
            if end <= start {
                end += Duration::days(1);
            }
            (start, end, 0)
        }
        _ => return Err(invalid()),
    };

    let earliest_end = now + Duration::minutes(MIN_LEAD_MINUTES);
    let end = loop {
        let localized = localize(&tz, end)?;
        if localized > earliest_end {
            break localized;
        }
        start += Duration::days(1);
        end += Duration::days(1);
    };
    let start = localize(&tz, start)?;

    Ok(TravelIntentWindow {
        direction,
        arrival_window_start: start.with_timezone(&Utc),
        arrival_window_end: end.with_timezone(&Utc),
        tolerance_minutes: tolerance,
    })
}

/// Local calendar dates touched by `[start, end]`, in order.
pub fn window_dates(start: DateTime<Utc>, end: DateTime<Utc>, tz: &Tz) -> Vec<NaiveDate> {
    let first = start.with_timezone(tz).date_naive();
    let last = end.with_timezone(tz).date_naive();
    first.iter_days().take_while(|d| *d <= last).collect()
}

fn to_candidate(segment: &ScheduleSegment, route: &Route) -> Option<CandidateThread> {
    let thread_id = segment.thread_id.as_deref().filter(|id| !id.is_empty())?;
    let departure = segment.departure?;
    let arrival = segment.arrival?;

    Some(CandidateThread {
        thread_id: thread_id.to_string(),
        departure_time: departure.with_timezone(&Utc),
        arrival_time: arrival.with_timezone(&Utc),
        from_station_code: route.from_station_code.clone(),
        to_station_code: route.to_station_code.clone(),
        from_station_title: route.from_station_title.clone(),
        to_station_title: route.to_station_title.clone(),
    })
}

/// Sort by departure and keep the first occurrence of each thread.
fn finish(mut threads: Vec<CandidateThread>) -> Vec<CandidateThread> {
    threads.sort_by(|a, b| {
        a.departure_time
            .cmp(&b.departure_time)
            .then_with(|| a.thread_id.cmp(&b.thread_id))
    });
    let mut seen = HashSet::new();
    threads.retain(|t| seen.insert(t.thread_id.clone()));
    threads
}

/// Keep segments whose arrival falls inside the window (inclusive).
pub fn filter_by_arrival(
    segments: &[ScheduleSegment],
    window: &TravelIntentWindow,
    route: &Route,
) -> Vec<CandidateThread> {
    finish(
        segments
            .iter()
            .filter_map(|s| to_candidate(s, route))
            .filter(|t| window.contains_arrival(t.arrival_time))
            .collect(),
    )
}

/// Keep segments departing inside `[from, until]`; used by searches
/// that carry no arrival window.
pub fn filter_by_departure(
    segments: &[ScheduleSegment],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    route: &Route,
) -> Vec<CandidateThread> {
    finish(
        segments
            .iter()
            .filter_map(|s| to_candidate(s, route))
            .filter(|t| from <= t.departure_time && t.departure_time <= until)
            .collect(),
    )
}

/// Lifetime for a new search: an hour past the arrival window (at least
/// an hour), or `default_minutes` without a window.
pub fn search_ttl(
    intent: Option<&TravelIntentWindow>,
    now: DateTime<Utc>,
    default_minutes: i64,
) -> Duration {
    match intent {
        Some(window) => (window.arrival_window_end - now + Duration::minutes(TTL_GRACE_MINUTES))
            .max(Duration::minutes(MIN_TTL_MINUTES)),
        None => Duration::minutes(default_minutes),
    }
}
