// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Newcomer notifications.
//!
//! Sends run concurrently with a bounded fan-out, each under its own
//! deadline; one failed or unresponsive recipient never stops delivery to
//! the rest or holds the batch open.

use crate::models::{NotifyTarget, UserId};
use crate::services::MessageGateway;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one notification batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: u32,
    pub failed: u32,
    pub failed_user_ids: Vec<UserId>,
}

impl DispatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Message shown to an already-waiting rider.
pub fn render_notification(target: &NotifyTarget) -> String {
    let newcomer = &target.newcomer;
    let who = newcomer
        .name
        .label()
        .unwrap_or_else(|| "Another rider".to_string());
    let trains = match target.matching_thread_ids.len() {
        1 => "one of your trains".to_string(),
        n => format!("{} of your trains", n),
    };
    format!(
        "🚆 {} ({} → {}) is looking at {}. Run your search again to see everyone riding with you.",
        who, newcomer.from_station_title, newcomer.to_station_title, trains
    )
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn MessageGateway>,
    concurrency: usize,
    /// Longest a single recipient may take; a send past it counts as failed
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn MessageGateway>, concurrency: usize, send_timeout: Duration) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    pub async fn dispatch(&self, targets: Vec<NotifyTarget>) -> DispatchReport {
        if targets.is_empty() {
            return DispatchReport::default();
        }

        let results: Vec<(UserId, bool)> = stream::iter(targets)
            .map(|target| {
                let gateway = self.gateway.clone();
                let send_timeout = self.send_timeout;
                async move {
                    let text = render_notification(&target);
                    let sent =
                        tokio::time::timeout(send_timeout, gateway.send(target.user_id, &text))
                            .await;
                    match sent {
                        Ok(Ok(())) => (target.user_id, true),
                        Ok(Err(e)) => {
                            tracing::warn!(
                                user_id = target.user_id,
                                newcomer = target.newcomer.user_id,
                                error = %e,
                                "Failed to notify rider"
                            );
                            (target.user_id, false)
                        }
                        Err(_) => {
                            tracing::warn!(
                                user_id = target.user_id,
                                newcomer = target.newcomer.user_id,
                                timeout_ms = send_timeout.as_millis() as u64,
                                "Timed out notifying rider"
                            );
                            (target.user_id, false)
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DispatchReport::default();
        for (user_id, ok) in results {
            if ok {
                report.sent += 1;
            } else {
                report.failed += 1;
                report.failed_user_ids.push(user_id);
            }
        }
        report.failed_user_ids.sort_unstable();

        if report.is_complete_success() {
            tracing::info!(sent = report.sent, "Dispatched notifications");
        } else {
            tracing::warn!(
                sent = report.sent,
                failed = report.failed,
                "Dispatched notifications with failures"
            );
        }
        report
    }
}
