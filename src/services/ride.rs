// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride search orchestration.
//!
//! One search resolves the user's route and arrival window, asks the
//! timetable provider for trains, stores the candidates, and tells
//! riders already waiting on the same trains that someone new joined.

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    Direction, MatchesByThread, NewcomerInfo, PendingSearch, RideUserProfile, Route,
    ScheduleSegment, TravelIntentWindow, UserId, UserSearchResult,
};
use crate::services::window::{self, WindowError};
use crate::services::{
    DispatchReport, IntentStore, NotificationDispatcher, OverlapMatcher, TimetableProvider,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

/// Longest trip considered when looking back from the arrival window
/// for departure dates.
const MAX_TRIP_HOURS: i64 = 4;

/// A request to (re)start a ride search.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RideSearchRequest {
    #[validate(nested)]
    pub profile: RideUserProfile,
    #[serde(default)]
    pub direction: Direction,
    /// Free-text arrival time; absent for a departure-horizon search
    #[serde(default)]
    #[validate(length(max = 64))]
    pub arrival: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RideSearchOutcome {
    /// The arrival text could not be read; nothing was stored.
    InvalidTime { input: String, reason: String },
    /// No train fits; any previous search is left as it was.
    NoTrains,
    /// The store refused or failed the write.
    NotSaved,
    Stored {
        candidate_threads: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent: Option<TravelIntentWindow>,
        ttl_minutes: i64,
        matches: MatchesByThread,
        notifications: DispatchReport,
    },
}

#[derive(Clone)]
pub struct RideSearchService {
    store: IntentStore,
    matcher: OverlapMatcher,
    provider: Arc<dyn TimetableProvider>,
    notifier: NotificationDispatcher,
    timezone: Tz,
    tolerance_minutes: u32,
    default_ttl_minutes: i64,
    legacy_window_minutes: i64,
}

impl RideSearchService {
    pub fn new(
        config: &Config,
        store: IntentStore,
        provider: Arc<dyn TimetableProvider>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            matcher: OverlapMatcher::new(store.clone()),
            store,
            provider,
            notifier,
            timezone: config.timezone,
            tolerance_minutes: config.tolerance_minutes,
            default_ttl_minutes: config.default_ttl_minutes,
            legacy_window_minutes: config.legacy_window_minutes,
        }
    }

    /// Run a search and store its candidates.
    ///
    /// Provider failures are returned as errors; everything else is an
    /// outcome the caller shows to the user.
    pub async fn search(&self, request: RideSearchRequest) -> Result<RideSearchOutcome> {
        let user_id = request.profile.user_id;
        let route = request.profile.route(request.direction);
        let now = self.store.now();

        let intent = match request.arrival.as_deref() {
            Some(raw) => {
                let local_now = now.with_timezone(&self.timezone);
                match window::parse_arrival_window(
                    raw,
                    local_now,
                    request.direction,
                    self.tolerance_minutes,
                ) {
                    Ok(intent) => Some(intent),
                    Err(e) => {
                        tracing::info!(user_id, input = raw, error = %e, "Rejected arrival time");
                        return Ok(invalid_time(raw, &e));
                    }
                }
            }
            None => None,
        };

        let candidates = match &intent {
            Some(window) => {
                let from = window.arrival_window_start - Duration::hours(MAX_TRIP_HOURS);
                let segments = self
                    .fetch_segments(&route, from, window.arrival_window_end)
                    .await?;
                window::filter_by_arrival(&segments, window, &route)
            }
            None => {
                let until = now + Duration::minutes(self.legacy_window_minutes);
                let segments = self.fetch_segments(&route, now, until).await?;
                window::filter_by_departure(&segments, now, until, &route)
            }
        };

        if candidates.is_empty() {
            tracing::info!(
                user_id,
                direction = request.direction.as_str(),
                from = %route.from_station_code,
                to = %route.to_station_code,
                "No trains found"
            );
            return Ok(RideSearchOutcome::NoTrains);
        }

        let pending = PendingSearch {
            user_id,
            name: request.profile.name.clone(),
            route,
            candidate_threads: candidates,
            intent,
        };
        let ttl = window::search_ttl(pending.intent.as_ref(), now, self.default_ttl_minutes);
        let newcomer = NewcomerInfo::from(&pending);
        let new_thread_ids: HashSet<String> = pending
            .candidate_threads
            .iter()
            .map(|t| t.thread_id.clone())
            .collect();
        let candidate_threads = pending.candidate_threads.len();
        let intent = pending.intent.clone();

        if !self.store.upsert(pending, ttl).await {
            return Ok(RideSearchOutcome::NotSaved);
        }

        let matches = self.matcher.find_matches(user_id).await;
        let targets = self
            .matcher
            .find_users_to_notify(&newcomer, &new_thread_ids)
            .await;
        let notifications = self.notifier.dispatch(targets).await;

        Ok(RideSearchOutcome::Stored {
            candidate_threads,
            intent,
            ttl_minutes: ttl.num_minutes(),
            matches,
            notifications,
        })
    }

    /// Stop searching. True only if a live search existed.
    pub async fn cancel(&self, user_id: UserId) -> bool {
        self.store.delete(user_id).await
    }

    pub async fn matches(&self, user_id: UserId) -> MatchesByThread {
        self.matcher.find_matches(user_id).await
    }

    pub async fn current(&self, user_id: UserId) -> Option<UserSearchResult> {
        self.store.get(user_id).await
    }

    /// Segments for every local date touched by `[from, until]`.
    async fn fetch_segments(
        &self,
        route: &Route,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ScheduleSegment>> {
        let dates: Vec<NaiveDate> = window::window_dates(from, until, &self.timezone);
        let days = try_join_all(dates.into_iter().map(|date| {
            self.provider
                .segments(&route.from_station_code, &route.to_station_code, date)
        }))
        .await?;
        Ok(days.into_iter().flatten().collect())
    }
}

fn invalid_time(raw: &str, error: &WindowError) -> RideSearchOutcome {
    RideSearchOutcome::InvalidTime {
        input: raw.trim().to_string(),
        reason: error.to_string(),
    }
}
