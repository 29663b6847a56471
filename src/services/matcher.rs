// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Overlap matcher: who else is riding my threads, and whom to tell
//! about a newcomer. Both queries are one indexed store lookup followed
//! by filtering of the returned records.

use crate::models::{MatchedUser, MatchesByThread, NewcomerInfo, NotifyTarget, UserId};
use crate::services::IntentStore;
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Clone)]
pub struct OverlapMatcher {
    store: IntentStore,
}

impl OverlapMatcher {
    pub fn new(store: IntentStore) -> Self {
        Self { store }
    }

    /// Group other riders by the thread they share with `user_id`.
    pub async fn find_matches(&self, user_id: UserId) -> MatchesByThread {
        let Some(own) = self.store.get(user_id).await else {
            tracing::debug!(user_id, "No search results to match");
            return MatchesByThread::new();
        };

        let own_threads = own.thread_ids();
        if own_threads.is_empty() {
            tracing::info!(user_id, "User has no candidate threads");
            return MatchesByThread::new();
        }

        let others = self.store.find_by_thread_ids(&own_threads, user_id).await;

        let mut matches = MatchesByThread::new();
        for other in others.iter().filter(|o| o.user_id != user_id) {
            for thread in &other.candidate_threads {
                if own_threads.contains(&thread.thread_id) {
                    matches
                        .entry(thread.thread_id.clone())
                        .or_default()
                        .push(MatchedUser::new(other, thread));
                }
            }
        }

        tracing::info!(
            user_id,
            threads = own_threads.len(),
            matches = matches.len(),
            "Found matching threads"
        );
        matches
    }

    /// Already-waiting riders who share any of `new_thread_ids` with the
    /// newcomer, one entry per rider listing every shared thread.
    pub async fn find_users_to_notify(
        &self,
        newcomer: &NewcomerInfo,
        new_thread_ids: &HashSet<String>,
    ) -> Vec<NotifyTarget> {
        if new_thread_ids.is_empty() {
            return Vec::new();
        }

        let others = self
            .store
            .find_by_thread_ids(new_thread_ids, newcomer.user_id)
            .await;

        let mut shared: BTreeMap<UserId, BTreeSet<String>> = BTreeMap::new();
        for other in others.iter().filter(|o| o.user_id != newcomer.user_id) {
            let threads: BTreeSet<String> = other
                .candidate_threads
                .iter()
                .filter(|t| new_thread_ids.contains(&t.thread_id))
                .map(|t| t.thread_id.clone())
                .collect();
            if !threads.is_empty() {
                shared.entry(other.user_id).or_default().extend(threads);
            }
        }

        tracing::info!(
            user_id = newcomer.user_id,
            recipients = shared.len(),
            "Resolved users to notify"
        );

        shared
            .into_iter()
            .map(|(user_id, threads)| NotifyTarget {
                user_id,
                matching_thread_ids: threads.into_iter().collect(),
                newcomer: newcomer.clone(),
            })
            .collect()
    }
}
