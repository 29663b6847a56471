// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stored ride search: one live record per user.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use super::{CandidateThread, Direction, TravelIntentWindow, UserId};

/// Optional name parts used when rendering a user to other riders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl DisplayName {
    /// Best human-readable label: full name, then first name, then `@username`.
    pub fn label(&self) -> Option<String> {
        let first = self.first_name.as_deref().filter(|s| !s.is_empty());
        let last = self.last_name.as_deref().filter(|s| !s.is_empty());
        match (first, last) {
            (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
            (Some(f), None) => Some(f.to_string()),
            _ => self
                .username
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|u| format!("@{}", u)),
        }
    }
}

/// Origin/destination of a search, already oriented by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub from_station_code: String,
    pub to_station_code: String,
    pub from_station_title: String,
    pub to_station_title: String,
}

/// Profile fields supplied by the user-profile collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RideUserProfile {
    pub user_id: UserId,
    #[serde(flatten)]
    pub name: DisplayName,
    #[validate(length(min = 1, max = 64))]
    pub home_station_code: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub home_station_title: String,
    #[validate(length(min = 1, max = 64))]
    pub destination_code: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub destination_title: String,
}

impl RideUserProfile {
    /// Orient the home/destination pair. Reverse swaps codes and titles.
    pub fn route(&self, direction: Direction) -> Route {
        let home = (&self.home_station_code, &self.home_station_title);
        let dest = (&self.destination_code, &self.destination_title);
        let (from, to) = match direction {
            Direction::Forward => (home, dest),
            Direction::Reverse => (dest, home),
        };
        Route {
            from_station_code: from.0.clone(),
            to_station_code: to.0.clone(),
            from_station_title: from.1.clone(),
            to_station_title: to.1.clone(),
        }
    }
}

/// A search ready to be stored; the store stamps its lifetime.
#[derive(Debug, Clone)]
pub struct PendingSearch {
    pub user_id: UserId,
    pub name: DisplayName,
    pub route: Route,
    pub candidate_threads: Vec<CandidateThread>,
    pub intent: Option<TravelIntentWindow>,
}

impl PendingSearch {
    /// Fix `created_at`/`expires_at`. TTL counts from creation.
    pub fn stamp(self, created_at: DateTime<Utc>, ttl: Duration) -> UserSearchResult {
        UserSearchResult {
            user_id: self.user_id,
            name: self.name,
            route: self.route,
            candidate_threads: self.candidate_threads,
            intent: self.intent,
            created_at,
            expires_at: created_at + ttl,
        }
    }
}

/// Stored search record, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchResult {
    pub user_id: UserId,
    #[serde(flatten)]
    pub name: DisplayName,
    #[serde(flatten)]
    pub route: Route,
    pub candidate_threads: Vec<CandidateThread>,
    /// Absent for legacy departure-horizon searches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<TravelIntentWindow>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl UserSearchResult {
    pub fn thread_ids(&self) -> HashSet<String> {
        self.candidate_threads
            .iter()
            .map(|t| t.thread_id.clone())
            .collect()
    }

    /// Expired records are invisible to every read.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RideUserProfile {
        RideUserProfile {
            user_id: 1,
            name: DisplayName::default(),
            home_station_code: "s9600731".to_string(),
            home_station_title: "Podolsk".to_string(),
            destination_code: "s9600891".to_string(),
            destination_title: "Tsaritsyno".to_string(),
        }
    }

    #[test]
    fn test_forward_route_keeps_home_first() {
        let route = profile().route(Direction::Forward);
        assert_eq!(route.from_station_code, "s9600731");
        assert_eq!(route.to_station_code, "s9600891");
        assert_eq!(route.from_station_title, "Podolsk");
        assert_eq!(route.to_station_title, "Tsaritsyno");
    }

    #[test]
    fn test_reverse_route_swaps_codes_and_titles() {
        let route = profile().route(Direction::Reverse);
        assert_eq!(route.from_station_code, "s9600891");
        assert_eq!(route.to_station_code, "s9600731");
        assert_eq!(route.from_station_title, "Tsaritsyno");
        assert_eq!(route.to_station_title, "Podolsk");
    }

    #[test]
    fn test_label_prefers_full_name() {
        let name = DisplayName {
            username: Some("alice".to_string()),
            first_name: Some("Alice".to_string()),
            last_name: Some("Smith".to_string()),
        };
        assert_eq!(name.label().as_deref(), Some("Alice Smith"));
    }

    #[test]
    fn test_label_falls_back_to_username() {
        let name = DisplayName {
            username: Some("bob".to_string()),
            first_name: Some(String::new()),
            last_name: None,
        };
        assert_eq!(name.label().as_deref(), Some("@bob"));
        assert_eq!(DisplayName::default().label(), None);
    }

    #[test]
    fn test_stamp_counts_ttl_from_creation() {
        let created = chrono::Utc::now();
        let record = PendingSearch {
            user_id: 1,
            name: DisplayName::default(),
            route: Route::default(),
            candidate_threads: vec![],
            intent: None,
        }
        .stamp(created, Duration::minutes(150));

        assert_eq!(record.expires_at - record.created_at, Duration::minutes(150));
        assert!(!record.is_expired(created + Duration::minutes(149)));
        assert!(record.is_expired(created + Duration::minutes(150)));
    }
}
