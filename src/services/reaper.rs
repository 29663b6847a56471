// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background removal of expired searches.
//!
//! Reads already hide expired records; this only reclaims space.

use crate::db::SearchResultBackend;
use crate::time_utils::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run one purge pass and return the number of records removed.
pub async fn reap_once(backend: &dyn SearchResultBackend, clock: &dyn Clock) -> usize {
    match backend.purge_expired(clock.now()).await {
        Ok(0) => 0,
        Ok(removed) => {
            tracing::info!(removed, "Purged expired search results");
            removed
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to purge expired search results");
            0
        }
    }
}

/// Spawn a task purging expired records every `period`.
pub fn spawn_reaper(
    backend: Arc<dyn SearchResultBackend>,
    clock: Arc<dyn Clock>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            reap_once(backend.as_ref(), clock.as_ref()).await;
        }
    })
}
