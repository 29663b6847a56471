// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use ride_matcher::config::Config;
use ride_matcher::db::{FirestoreIntentStore, MemoryIntentStore};
use ride_matcher::error::AppError;
use ride_matcher::models::{
    CandidateThread, DisplayName, PendingSearch, RideUserProfile, Route, ScheduleSegment, UserId,
};
use ride_matcher::routes::create_router;
use ride_matcher::services::{
    IntentStore, MessageGateway, NotificationDispatcher, RideSearchService, TimetableProvider,
};
use ride_matcher::time_utils::ManualClock;
use ride_matcher::AppState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const HOME: &str = "s9600731";
pub const WORK: &str = "s2000001";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreIntentStore {
    FirestoreIntentStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Moscow offset; the fake timetable reports times in it.
#[allow(dead_code)]
pub fn msk() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

/// 2026-03-02 at the given Moscow wall time, as UTC.
#[allow(dead_code)]
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    msk()
        .with_ymd_and_hms(2026, 3, 2, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// The instant every test clock starts at: 06:00 Moscow.
#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    at(6, 0)
}

#[allow(dead_code)]
pub fn thread(id: &str, departure: DateTime<Utc>, arrival: DateTime<Utc>) -> CandidateThread {
    CandidateThread {
        thread_id: id.to_string(),
        departure_time: departure,
        arrival_time: arrival,
        from_station_code: HOME.to_string(),
        to_station_code: WORK.to_string(),
        from_station_title: "Podolsk".to_string(),
        to_station_title: "Moscow Kursky".to_string(),
    }
}

#[allow(dead_code)]
pub fn name(first: &str) -> DisplayName {
    DisplayName {
        username: Some(first.to_lowercase()),
        first_name: Some(first.to_string()),
        last_name: None,
    }
}

/// A search over `thread_ids`, all departing 08:00 and arriving 08:40.
#[allow(dead_code)]
pub fn pending(user_id: UserId, thread_ids: &[&str]) -> PendingSearch {
    PendingSearch {
        user_id,
        name: name(&format!("User{}", user_id)),
        route: Route {
            from_station_code: HOME.to_string(),
            to_station_code: WORK.to_string(),
            from_station_title: "Podolsk".to_string(),
            to_station_title: "Moscow Kursky".to_string(),
        },
        candidate_threads: thread_ids
            .iter()
            .map(|id| thread(id, at(8, 0), at(8, 40)))
            .collect(),
        intent: None,
    }
}

#[allow(dead_code)]
pub fn profile(user_id: UserId, first: &str) -> RideUserProfile {
    RideUserProfile {
        user_id,
        name: name(first),
        home_station_code: HOME.to_string(),
        home_station_title: "Podolsk".to_string(),
        destination_code: WORK.to_string(),
        destination_title: "Moscow Kursky".to_string(),
    }
}

/// Provider segment on 2026-03-02, Moscow wall times.
#[allow(dead_code)]
pub fn segment(id: &str, departure: (u32, u32), arrival: (u32, u32)) -> ScheduleSegment {
    let local = |(h, m): (u32, u32)| msk().with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap();
    ScheduleSegment {
        thread_id: Some(id.to_string()),
        departure: Some(local(departure)),
        arrival: Some(local(arrival)),
    }
}

/// Timetable returning a fixed list of segments for any route and date.
#[derive(Default)]
pub struct FakeTimetable {
    pub segments: Mutex<Vec<ScheduleSegment>>,
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<(String, String, NaiveDate)>>,
}

#[allow(dead_code)]
impl FakeTimetable {
    pub fn set_segments(&self, segments: Vec<ScheduleSegment>) {
        *self.segments.lock().unwrap() = segments;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, String, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimetableProvider for FakeTimetable {
    async fn segments(
        &self,
        from_code: &str,
        to_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleSegment>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((from_code.to_string(), to_code.to_string(), date));
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Timetable("HTTP 503: unavailable".to_string()));
        }
        Ok(self.segments.lock().unwrap().clone())
    }
}

/// Gateway recording every delivered message.
#[derive(Default)]
pub struct RecordingGateway {
    pub fail_ids: Mutex<HashSet<UserId>>,
    pub delivered: Mutex<Vec<(UserId, String)>>,
}

#[allow(dead_code)]
impl RecordingGateway {
    pub fn delivered(&self) -> Vec<(UserId, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), AppError> {
        if self.fail_ids.lock().unwrap().contains(&user_id) {
            return Err(AppError::Gateway("Forbidden: bot was blocked".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((user_id, text.to_string()));
        Ok(())
    }
}

/// Everything a test needs to drive the engine against in-memory storage.
#[allow(dead_code)]
pub struct TestHarness {
    pub clock: Arc<ManualClock>,
    pub memory: Arc<MemoryIntentStore>,
    pub store: IntentStore,
    pub timetable: Arc<FakeTimetable>,
    pub gateway: Arc<RecordingGateway>,
    pub rides: RideSearchService,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let memory = Arc::new(MemoryIntentStore::new());
        let store = IntentStore::new(memory.clone(), clock.clone());
        let timetable = Arc::new(FakeTimetable::default());
        let gateway = Arc::new(RecordingGateway::default());
        let config = Config::default();
        let notifier = NotificationDispatcher::new(
            gateway.clone(),
            config.notify_concurrency,
            std::time::Duration::from_secs(config.notify_timeout_secs),
        );
        let rides = RideSearchService::new(&config, store.clone(), timetable.clone(), notifier);

        Self {
            clock,
            memory,
            store,
            timetable,
            gateway,
            rides,
        }
    }

    pub fn advance(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state, and the harness behind it.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, TestHarness) {
    let harness = TestHarness::new();
    let state = Arc::new(AppState {
        config: Config::default(),
        rides: harness.rides.clone(),
    });

    (create_router(state.clone()), state, harness)
}

/// Intent store over an offline Firestore client; every backend call fails.
#[allow(dead_code)]
pub fn offline_store() -> IntentStore {
    IntentStore::new(
        Arc::new(FirestoreIntentStore::new_mock()),
        Arc::new(ManualClock::new(start_time())),
    )
}
