// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod gateway;
pub mod matcher;
pub mod notifier;
pub mod reaper;
pub mod ride;
pub mod schedules;
pub mod store;
pub mod window;

pub use gateway::{MessageGateway, TelegramGateway};
pub use matcher::OverlapMatcher;
pub use notifier::{DispatchReport, NotificationDispatcher};
pub use reaper::spawn_reaper;
pub use ride::{RideSearchOutcome, RideSearchRequest, RideSearchService};
pub use schedules::{TimetableProvider, YandexSchedulesClient};
pub use store::IntentStore;
