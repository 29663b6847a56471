use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use ride_matcher::db::{MemoryIntentStore, SearchResultBackend};
use ride_matcher::models::{CandidateThread, DisplayName, Route, UserSearchResult};
use std::collections::HashSet;
use std::hint::black_box;

const USERS: i64 = 10_000;
const THREADS_PER_USER: i64 = 6;
// Distinct runs in a busy day of suburban service
const DISTINCT_THREADS: i64 = 2_000;

fn record(user_id: i64) -> UserSearchResult {
    let created = Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap();
    let candidate_threads = (0..THREADS_PER_USER)
        .map(|i| {
            let n = (user_id * 7 + i) % DISTINCT_THREADS;
            let departure = created + Duration::minutes(n % 600);
            CandidateThread {
                thread_id: format!("{}_0_9600731_g26_4", 6000 + n),
                departure_time: departure,
                arrival_time: departure + Duration::minutes(45),
                from_station_code: "s9600731".to_string(),
                to_station_code: "s2000001".to_string(),
                from_station_title: "Podolsk".to_string(),
                to_station_title: "Moscow Kursky".to_string(),
            }
        })
        .collect();

    UserSearchResult {
        user_id,
        name: DisplayName::default(),
        route: Route::default(),
        candidate_threads,
        intent: None,
        created_at: created,
        expires_at: created + Duration::minutes(150),
    }
}

fn benchmark_find_by_thread_ids(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let store = MemoryIntentStore::new();
    rt.block_on(async {
        for user_id in 0..USERS {
            store.put(&record(user_id)).await.expect("put");
        }
    });

    let now = Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap();
    let probe = record(USERS + 1).thread_ids();
    let miss: HashSet<String> = ["no-such-thread".to_string()].into_iter().collect();

    let mut group = c.benchmark_group("find_by_thread_ids");

    group.bench_function("overlapping_search_10k", |b| {
        b.iter(|| {
            rt.block_on(store.find_by_thread_ids(black_box(&probe), USERS + 1, now))
                .expect("query")
        })
    });

    group.bench_function("no_overlap_10k", |b| {
        b.iter(|| {
            rt.block_on(store.find_by_thread_ids(black_box(&miss), USERS + 1, now))
                .expect("query")
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_find_by_thread_ids);
criterion_main!(benches);
