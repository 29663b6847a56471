// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride Matcher API Server
//!
//! Stores commuters' train searches and tells riders who share a train
//! about each other.

use ride_matcher::{
    config::Config,
    db::{FirestoreIntentStore, MemoryIntentStore, SearchResultBackend},
    services::{
        spawn_reaper, IntentStore, MessageGateway, NotificationDispatcher, RideSearchService,
        TelegramGateway, YandexSchedulesClient,
    },
    time_utils::{Clock, SystemClock},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        timezone = %config.timezone,
        "Starting Ride Matcher API"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Firestore when a project is configured, otherwise in-process storage
    let backend: Arc<dyn SearchResultBackend> = match &config.gcp_project_id {
        Some(project_id) => Arc::new(
            FirestoreIntentStore::new(project_id)
                .await
                .expect("Failed to connect to Firestore"),
        ),
        None => {
            tracing::warn!("GCP_PROJECT_ID not set, using in-memory search store");
            let memory: Arc<dyn SearchResultBackend> = Arc::new(MemoryIntentStore::new());
            spawn_reaper(
                memory.clone(),
                clock.clone(),
                Duration::from_secs(config.reaper_interval_secs),
            );
            memory
        }
    };

    let store = IntentStore::new(backend, clock);

    let provider = Arc::new(
        YandexSchedulesClient::new(config.yandex_api_key.clone(), config.timezone.name())
            .expect("Failed to build timetable client"),
    );

    let gateway: Arc<dyn MessageGateway> = match &config.telegram_bot_token {
        Some(token) => Arc::new(
            TelegramGateway::new(token.clone()).expect("Failed to build Telegram client"),
        ),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications will fail");
            Arc::new(TelegramGateway::new_mock())
        }
    };
    let notifier = NotificationDispatcher::new(
        gateway,
        config.notify_concurrency,
        Duration::from_secs(config.notify_timeout_secs),
    );

    let rides = RideSearchService::new(&config, store, provider, notifier);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        rides,
    });

    // Build router
    let app = ride_matcher::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ride_matcher=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
