// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the ride-matching engine.

pub mod intent;
pub mod matching;
pub mod search;
pub mod thread;

pub use intent::{Direction, TravelIntentWindow};
pub use matching::{MatchedUser, MatchesByThread, NewcomerInfo, NotifyTarget};
pub use search::{DisplayName, PendingSearch, RideUserProfile, Route, UserSearchResult};
pub use thread::{CandidateThread, ScheduleSegment};

/// Chat-platform user identifier (Telegram ID).
pub type UserId = i64;
