// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! The user's travel goal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction relative to the user's configured home/destination pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Home to destination
    #[default]
    Forward,
    /// Destination back home
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

/// Arrival window a user wants to hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelIntentWindow {
    pub direction: Direction,
    pub arrival_window_start: DateTime<Utc>,
    pub arrival_window_end: DateTime<Utc>,
    /// Zero when the window came from an explicit range
    pub tolerance_minutes: u32,
}

impl TravelIntentWindow {
    /// Inclusive on both ends.
    pub fn contains_arrival(&self, arrival: DateTime<Utc>) -> bool {
        self.arrival_window_start <= arrival && arrival <= self.arrival_window_end
    }
}
