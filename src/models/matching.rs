// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Read-side shapes produced by the overlap matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CandidateThread, DisplayName, PendingSearch, UserId, UserSearchResult};

/// Another rider sharing one of the caller's threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedUser {
    pub user_id: UserId,
    #[serde(flatten)]
    pub name: DisplayName,
    pub from_station_title: String,
    pub to_station_title: String,
    /// Their boarding time on the shared thread
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

impl MatchedUser {
    pub fn new(other: &UserSearchResult, thread: &CandidateThread) -> Self {
        Self {
            user_id: other.user_id,
            name: other.name.clone(),
            from_station_title: other.route.from_station_title.clone(),
            to_station_title: other.route.to_station_title.clone(),
            departure_time: thread.departure_time,
            arrival_time: thread.arrival_time,
        }
    }
}

/// `thread_id -> riders sharing it`. Only non-empty groups are present.
pub type MatchesByThread = BTreeMap<String, Vec<MatchedUser>>;

/// What an already-waiting rider is told about a newcomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewcomerInfo {
    pub user_id: UserId,
    #[serde(flatten)]
    pub name: DisplayName,
    pub from_station_title: String,
    pub to_station_title: String,
}

impl From<&UserSearchResult> for NewcomerInfo {
    fn from(result: &UserSearchResult) -> Self {
        Self {
            user_id: result.user_id,
            name: result.name.clone(),
            from_station_title: result.route.from_station_title.clone(),
            to_station_title: result.route.to_station_title.clone(),
        }
    }
}

impl From<&PendingSearch> for NewcomerInfo {
    fn from(search: &PendingSearch) -> Self {
        Self {
            user_id: search.user_id,
            name: search.name.clone(),
            from_station_title: search.route.from_station_title.clone(),
            to_station_title: search.route.to_station_title.clone(),
        }
    }
}

/// One notification recipient; each user appears at most once per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyTarget {
    pub user_id: UserId,
    /// Sorted, de-duplicated
    pub matching_thread_ids: Vec<String>,
    pub newcomer: NewcomerInfo,
}
