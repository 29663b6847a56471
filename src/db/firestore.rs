// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed search-result store.
//!
//! One document per user in `user_search_results`, document ID = user ID,
//! so a replace is a single atomic document write. Candidate thread IDs are
//! duplicated into a flat `thread_ids` array; Firestore indexes arrays
//! automatically, and `array-contains-any` on that field is the
//! secondary-index lookup. `expires_at` is a native timestamp so a
//! collection TTL policy on it removes expired documents.

use crate::db::{collections, SearchResultBackend};
use crate::error::AppError;
use crate::models::{
    CandidateThread, DisplayName, Route, TravelIntentWindow, UserId, UserSearchResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// Firestore caps `array-contains-any` at 30 comparison values.
const MAX_ANY_VALUES: usize = 30;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Stored document shape. Kept separate from the domain record so that
/// documents are validated on the way out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SearchResultDocument {
    user_id: UserId,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    from_station_code: String,
    to_station_code: String,
    from_station_title: String,
    to_station_title: String,
    candidate_threads: Vec<CandidateThread>,
    /// Flattened copy of `candidate_threads[].thread_id` for the index
    thread_ids: Vec<String>,
    intent: Option<TravelIntentWindow>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    expires_at: DateTime<Utc>,
}

impl From<&UserSearchResult> for SearchResultDocument {
    fn from(record: &UserSearchResult) -> Self {
        let mut thread_ids: Vec<String> = record.thread_ids().into_iter().collect();
        thread_ids.sort();

        Self {
            user_id: record.user_id,
            username: record.name.username.clone(),
            first_name: record.name.first_name.clone(),
            last_name: record.name.last_name.clone(),
            from_station_code: record.route.from_station_code.clone(),
            to_station_code: record.route.to_station_code.clone(),
            from_station_title: record.route.from_station_title.clone(),
            to_station_title: record.route.to_station_title.clone(),
            candidate_threads: record.candidate_threads.clone(),
            thread_ids,
            intent: record.intent.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

impl TryFrom<SearchResultDocument> for UserSearchResult {
    type Error = AppError;

    fn try_from(doc: SearchResultDocument) -> Result<Self, Self::Error> {
        if doc.candidate_threads.is_empty() {
            return Err(AppError::Database(format!(
                "search result for user {} has no candidate threads",
                doc.user_id
            )));
        }
        if doc.expires_at <= doc.created_at {
            return Err(AppError::Database(format!(
                "search result for user {} expires before it was created",
                doc.user_id
            )));
        }

        Ok(Self {
            user_id: doc.user_id,
            name: DisplayName {
                username: doc.username,
                first_name: doc.first_name,
                last_name: doc.last_name,
            },
            route: Route {
                from_station_code: doc.from_station_code,
                to_station_code: doc.to_station_code,
                from_station_title: doc.from_station_title,
                to_station_title: doc.to_station_title,
            },
            candidate_threads: doc.candidate_threads,
            intent: doc.intent,
            created_at: doc.created_at,
            expires_at: doc.expires_at,
        })
    }
}

/// Only the key, for expiry sweeps.
#[derive(Debug, Deserialize)]
struct DocumentKey {
    user_id: UserId,
}

/// Decode a raw document, logging and skipping anything malformed.
fn decode_document(doc: &firestore::FirestoreDocument) -> Option<UserSearchResult> {
    let parsed = firestore::FirestoreDb::deserialize_doc_to::<SearchResultDocument>(doc)
        .map_err(|e| AppError::Database(e.to_string()))
        .and_then(UserSearchResult::try_from);

    match parsed {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(document = %doc.name, error = %e, "Skipping malformed search result");
            None
        }
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreIntentStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreIntentStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn get_document(
        &self,
        user_id: UserId,
    ) -> Result<Option<firestore::FirestoreDocument>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_SEARCH_RESULTS)
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete documents by user ID in transactional batches.
    async fn batch_delete(&self, user_ids: &[UserId]) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in user_ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for user_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::USER_SEARCH_RESULTS)
                    .document_id(user_id.to_string())
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl SearchResultBackend for FirestoreIntentStore {
    async fn put(&self, record: &UserSearchResult) -> Result<(), AppError> {
        let doc = SearchResultDocument::from(record);

        // Full-document update without a field mask replaces every field.
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_SEARCH_RESULTS)
            .document_id(record.user_id.to_string())
            .object(&doc)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSearchResult>, AppError> {
        let doc = self.get_document(user_id).await?;
        Ok(doc
            .as_ref()
            .and_then(decode_document)
            .filter(|r| !r.is_expired(now)))
    }

    async fn delete(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool, AppError> {
        let Some(doc) = self.get_document(user_id).await? else {
            return Ok(false);
        };
        let live = decode_document(&doc).is_some_and(|r| !r.is_expired(now));

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USER_SEARCH_RESULTS)
            .document_id(user_id.to_string())
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(live)
    }

    async fn find_by_thread_ids(
        &self,
        thread_ids: &HashSet<String>,
        excluding: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserSearchResult>, AppError> {
        let client = self.get_client()?;
        let mut ids: Vec<String> = thread_ids.iter().cloned().collect();
        ids.sort();

        let mut found: HashMap<UserId, UserSearchResult> = HashMap::new();
        for chunk in ids.chunks(MAX_ANY_VALUES) {
            let chunk = chunk.to_vec();
            let docs: Vec<firestore::FirestoreDocument> = client
                .fluent()
                .select()
                .from(collections::USER_SEARCH_RESULTS)
                .filter(move |q| {
                    q.for_all([
                        q.field("thread_ids").array_contains_any(chunk.clone()),
                        q.field("expires_at")
                            .greater_than(firestore::FirestoreTimestamp(now)),
                    ])
                })
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            for record in docs.iter().filter_map(decode_document) {
                if record.user_id != excluding && !record.is_expired(now) {
                    found.insert(record.user_id, record);
                }
            }
        }

        Ok(found.into_values().collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let keys: Vec<DocumentKey> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_SEARCH_RESULTS)
            .filter(move |q| {
                q.field("expires_at")
                    .less_than_or_equal(firestore::FirestoreTimestamp(now))
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user_ids: Vec<UserId> = keys.iter().map(|k| k.user_id).collect();
        self.batch_delete(&user_ids).await?;

        tracing::debug!(count = user_ids.len(), "Purged expired search results");
        Ok(user_ids.len())
    }
}
