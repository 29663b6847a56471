// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Intent store: time-bounded search results keyed by user.
//!
//! Wraps a [`SearchResultBackend`] with the caller-facing contract:
//! storage failures are logged and degrade to "not saved" / "no data",
//! and expired records are filtered on every read even if the backend's
//! own expiry has not caught up yet.

use crate::db::SearchResultBackend;
use crate::models::{PendingSearch, UserId, UserSearchResult};
use crate::time_utils::{format_utc_rfc3339, Clock};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Shared handle to the search-result store.
#[derive(Clone)]
pub struct IntentStore {
    backend: Arc<dyn SearchResultBackend>,
    clock: Arc<dyn Clock>,
}

impl IntentStore {
    pub fn new(backend: Arc<dyn SearchResultBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn backend(&self) -> Arc<dyn SearchResultBackend> {
        self.backend.clone()
    }

    /// Store `search`, replacing any previous record for the same user.
    ///
    /// Returns false if nothing was saved; callers must not promise
    /// matches in that case.
    pub async fn upsert(&self, search: PendingSearch, ttl: Duration) -> bool {
        let user_id = search.user_id;
        if search.candidate_threads.is_empty() {
            tracing::warn!(user_id, "Refusing to store search without candidate threads");
            return false;
        }
        if ttl <= Duration::zero() {
            tracing::warn!(user_id, ttl_minutes = ttl.num_minutes(), "Refusing non-positive TTL");
            return false;
        }

        let record = search.stamp(self.now(), ttl);
        match self.backend.put(&record).await {
            Ok(()) => {
                tracing::info!(
                    user_id,
                    threads = record.candidate_threads.len(),
                    ttl_minutes = ttl.num_minutes(),
                    expires_at = %format_utc_rfc3339(record.expires_at),
                    "Stored search results"
                );
                true
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to store search results");
                false
            }
        }
    }

    /// Current live record for `user_id`.
    pub async fn get(&self, user_id: UserId) -> Option<UserSearchResult> {
        let now = self.now();
        match self.backend.get(user_id, now).await {
            Ok(record) => record.filter(|r| !r.is_expired(now)),
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to get search results");
                None
            }
        }
    }

    /// Cancel a search. True only if a live search was removed.
    pub async fn delete(&self, user_id: UserId) -> bool {
        match self.backend.delete(user_id, self.now()).await {
            Ok(true) => {
                tracing::info!(user_id, "Cleared search results");
                true
            }
            Ok(false) => {
                tracing::debug!(user_id, "No search results to clear");
                false
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to clear search results");
                false
            }
        }
    }

    /// Live records of other users sharing any of `thread_ids`.
    pub async fn find_by_thread_ids(
        &self,
        thread_ids: &HashSet<String>,
        excluding: UserId,
    ) -> Vec<UserSearchResult> {
        if thread_ids.is_empty() {
            return Vec::new();
        }

        let now = self.now();
        match self
            .backend
            .find_by_thread_ids(thread_ids, excluding, now)
            .await
        {
            Ok(records) => records
                .into_iter()
                .filter(|r| r.user_id != excluding && !r.is_expired(now))
                .collect(),
            Err(e) => {
                tracing::error!(
                    user_id = excluding,
                    threads = thread_ids.len(),
                    error = %e,
                    "Failed to query search results by thread"
                );
                Vec::new()
            }
        }
    }
}
