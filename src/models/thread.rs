// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Train runs ("threads") as returned by the timetable provider and as
//! stored against a user's search.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One train a user could take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateThread {
    /// Provider identifier of the scheduled run (opaque)
    pub thread_id: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub from_station_code: String,
    pub to_station_code: String,
    pub from_station_title: String,
    pub to_station_title: String,
}

/// Raw scheduled segment from the timetable provider.
///
/// Every field is optional because provider responses are not trusted;
/// incomplete segments are dropped before anything is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSegment {
    pub thread_id: Option<String>,
    pub departure: Option<DateTime<FixedOffset>>,
    pub arrival: Option<DateTime<FixedOffset>>,
}
