// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: raw search-result storage.
//!
//! Backends report failures as `AppError::Database`; the
//! [`IntentStore`](crate::services::IntentStore) facade turns those into
//! degraded results for callers.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreIntentStore;
pub use memory::MemoryIntentStore;

use crate::error::AppError;
use crate::models::{UserId, UserSearchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Collection names as constants.
pub mod collections {
    /// Live ride searches (keyed by user_id)
    pub const USER_SEARCH_RESULTS: &str = "user_search_results";
}

/// Storage operations over `UserSearchResult` documents.
///
/// Writes are single-document and atomic per `user_id`. Reads take `now`
/// so expired documents are never returned even if not yet removed.
#[async_trait]
pub trait SearchResultBackend: Send + Sync {
    /// Replace the document for `record.user_id` (insert if absent).
    async fn put(&self, record: &UserSearchResult) -> Result<(), AppError>;

    /// Fetch a live document.
    async fn get(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSearchResult>, AppError>;

    /// Remove a document. Returns whether a live document was removed.
    async fn delete(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Live documents (other than `excluding`) holding any of `thread_ids`.
    async fn find_by_thread_ids(
        &self,
        thread_ids: &HashSet<String>,
        excluding: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserSearchResult>, AppError>;

    /// Physically remove documents with `expires_at <= now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}
