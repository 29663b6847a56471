// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process search-result store.
//!
//! Records live in a `DashMap` keyed by user; a second `DashMap` maps each
//! `thread_id` to the users whose live record lists it. Every index change
//! for a user happens while that user's record entry is locked, so the
//! index never lags a committed replace. Lock order is always
//! record entry then index shard.

use crate::db::SearchResultBackend;
use crate::error::AppError;
use crate::models::{UserId, UserSearchResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// DashMap-backed store with a `thread_id` secondary index.
#[derive(Debug, Default)]
pub struct MemoryIntentStore {
    records: DashMap<UserId, UserSearchResult>,
    index: DashMap<String, HashSet<UserId>>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically present records, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct thread ids currently indexed.
    pub fn indexed_thread_count(&self) -> usize {
        self.index.len()
    }

    fn index_threads<'a>(&self, user_id: UserId, thread_ids: impl IntoIterator<Item = &'a String>) {
        for thread_id in thread_ids {
            self.index
                .entry(thread_id.clone())
                .or_default()
                .insert(user_id);
        }
    }

    fn unindex_threads<'a>(
        &self,
        user_id: UserId,
        thread_ids: impl IntoIterator<Item = &'a String>,
    ) {
        for thread_id in thread_ids {
            let now_empty = match self.index.get_mut(thread_id) {
                Some(mut users) => {
                    users.remove(&user_id);
                    users.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.index.remove_if(thread_id, |_, users| users.is_empty());
            }
        }
    }
}

#[async_trait]
impl SearchResultBackend for MemoryIntentStore {
    async fn put(&self, record: &UserSearchResult) -> Result<(), AppError> {
        let new_ids = record.thread_ids();

        match self.records.entry(record.user_id) {
            Entry::Occupied(mut slot) => {
                let stale: Vec<String> = slot
                    .get()
                    .thread_ids()
                    .difference(&new_ids)
                    .cloned()
                    .collect();
                self.index_threads(record.user_id, &new_ids);
                slot.insert(record.clone());
                self.unindex_threads(record.user_id, &stale);
            }
            Entry::Vacant(slot) => {
                self.index_threads(record.user_id, &new_ids);
                slot.insert(record.clone());
            }
        }
        Ok(())
    }

    async fn get(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSearchResult>, AppError> {
        Ok(self
            .records
            .get(&user_id)
            .filter(|r| !r.is_expired(now))
            .map(|r| r.value().clone()))
    }

    async fn delete(&self, user_id: UserId, now: DateTime<Utc>) -> Result<bool, AppError> {
        match self.records.entry(user_id) {
            Entry::Occupied(slot) => {
                let live = !slot.get().is_expired(now);
                let ids = slot.get().thread_ids();
                self.unindex_threads(user_id, &ids);
                slot.remove();
                Ok(live)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn find_by_thread_ids(
        &self,
        thread_ids: &HashSet<String>,
        excluding: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserSearchResult>, AppError> {
        let mut user_ids: HashSet<UserId> = HashSet::new();
        for thread_id in thread_ids {
            if let Some(users) = self.index.get(thread_id) {
                user_ids.extend(users.iter().copied());
            }
        }
        user_ids.remove(&excluding);

        let found = user_ids
            .into_iter()
            .filter_map(|user_id| self.records.get(&user_id).map(|r| r.value().clone()))
            // The record may have been replaced after the index read.
            .filter(|r| {
                !r.is_expired(now)
                    && r
                        .candidate_threads
                        .iter()
                        .any(|t| thread_ids.contains(&t.thread_id))
            })
            .collect();
        Ok(found)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired: Vec<UserId> = self
            .records
            .iter()
            .filter(|r| r.value().is_expired(now))
            .map(|r| *r.key())
            .collect();

        let mut removed = 0;
        for user_id in expired {
            if let Entry::Occupied(slot) = self.records.entry(user_id) {
                // Re-check: the user may have stored a fresh search meanwhile.
                if slot.get().is_expired(now) {
                    let ids = slot.get().thread_ids();
                    self.unindex_threads(user_id, &ids);
                    slot.remove();
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateThread, DisplayName, Route};
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn thread(id: &str) -> CandidateThread {
        CandidateThread {
            thread_id: id.to_string(),
            departure_time: at(5, 0),
            arrival_time: at(5, 40),
            from_station_code: "s1".to_string(),
            to_station_code: "s2".to_string(),
            from_station_title: "A".to_string(),
            to_station_title: "B".to_string(),
        }
    }

    fn record(user_id: UserId, threads: &[&str], expires_at: DateTime<Utc>) -> UserSearchResult {
        UserSearchResult {
            user_id,
            name: DisplayName::default(),
            route: Route::default(),
            candidate_threads: threads.iter().map(|t| thread(t)).collect(),
            intent: None,
            created_at: at(4, 0),
            expires_at,
        }
    }

    fn ids(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_replace_drops_stale_index_entries() {
        let store = MemoryIntentStore::new();
        store.put(&record(1, &["t1", "t2"], at(7, 0))).await.unwrap();
        assert_eq!(store.indexed_thread_count(), 2);

        store.put(&record(1, &["t3"], at(7, 0))).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.indexed_thread_count(), 1);
        let found = store
            .find_by_thread_ids(&ids(&["t1", "t2"]), 99, at(5, 0))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_excludes_caller_and_expired() {
        let store = MemoryIntentStore::new();
        store.put(&record(1, &["t1"], at(7, 0))).await.unwrap();
        store.put(&record(2, &["t1"], at(7, 0))).await.unwrap();
        store.put(&record(3, &["t1"], at(5, 0))).await.unwrap();

        let found = store
            .find_by_thread_ids(&ids(&["t1"]), 1, at(5, 0))
            .await
            .unwrap();

        let users: Vec<UserId> = found.iter().map(|r| r.user_id).collect();
        assert_eq!(users, vec![2]);
    }

    #[tokio::test]
    async fn test_delete_reports_live_record_only() {
        let store = MemoryIntentStore::new();
        store.put(&record(1, &["t1"], at(7, 0))).await.unwrap();
        store.put(&record(2, &["t2"], at(5, 0))).await.unwrap();

        assert!(store.delete(1, at(5, 0)).await.unwrap());
        assert!(!store.delete(1, at(5, 0)).await.unwrap());
        // Expired: physically removed, but nothing live was cancelled.
        assert!(!store.delete(2, at(5, 0)).await.unwrap());
        assert!(store.is_empty());
        assert_eq!(store.indexed_thread_count(), 0);
    }

    #[tokio::test]
    async fn test_purge_removes_expired_and_their_index() {
        let store = MemoryIntentStore::new();
        store.put(&record(1, &["t1", "shared"], at(5, 0))).await.unwrap();
        store.put(&record(2, &["shared"], at(9, 0))).await.unwrap();

        let removed = store.purge_expired(at(6, 0)).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.indexed_thread_count(), 1);
        assert!(store.get(2, at(6, 0)).await.unwrap().is_some());
        assert!(store.get(1, at(6, 0) - Duration::hours(2)).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_index_consistent() {
        const USERS: i64 = 5;
        const THREADS: usize = 7;
        let names: Vec<String> = (0..THREADS).map(|i| format!("t{}", i)).collect();
        let store = std::sync::Arc::new(MemoryIntentStore::new());
        let now = at(6, 0);

        let mut handles = Vec::new();
        for i in 0..400usize {
            let store = store.clone();
            let first = names[i % THREADS].clone();
            let second = names[(i + 1) % THREADS].clone();
            let user_id = (i as i64 % USERS) + 1;
            handles.push(tokio::spawn(async move {
                match i % 4 {
                    0 | 1 => {
                        let expires_at = if i % 3 == 0 { at(5, 0) } else { at(9, 0) };
                        let rec = record(user_id, &[first.as_str(), second.as_str()], expires_at);
                        store.put(&rec).await.unwrap();
                    }
                    2 => {
                        let wanted = ids(&[first.as_str()]);
                        for found in store.find_by_thread_ids(&wanted, user_id, now).await.unwrap() {
                            assert_ne!(found.user_id, user_id);
                            assert!(!found.is_expired(now));
                            assert!(found.thread_ids().contains(&first));
                        }
                        store.delete(user_id, now).await.unwrap();
                    }
                    _ => {
                        store.purge_expired(now).await.unwrap();
                    }
                }
                tokio::task::yield_now().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        store.purge_expired(now).await.unwrap();

        // Index is exactly the inverse of the surviving records.
        let mut expected: std::collections::HashMap<String, HashSet<UserId>> =
            std::collections::HashMap::new();
        for entry in store.records.iter() {
            for thread_id in entry.value().thread_ids() {
                expected.entry(thread_id).or_default().insert(*entry.key());
            }
        }
        let actual: std::collections::HashMap<String, HashSet<UserId>> = store
            .index
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        assert_eq!(actual, expected);

        // Every surviving record is found under its threads, as stored.
        let all_threads: HashSet<String> = names.iter().cloned().collect();
        let found = store.find_by_thread_ids(&all_threads, 0, now).await.unwrap();
        assert_eq!(found.len(), store.len());
        for rec in found {
            assert_eq!(store.get(rec.user_id, now).await.unwrap(), Some(rec));
        }
    }
}
