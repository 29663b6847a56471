// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timetable provider: scheduled segments between two stations.
//!
//! The production provider is the Yandex Schedules ("Rasp") search API.

use crate::error::AppError;
use crate::models::ScheduleSegment;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Segments requested per call; enough for a full day of suburban trains.
const SEARCH_LIMIT: u32 = 300;

/// Source of scheduled segments for a route and local date.
#[async_trait]
pub trait TimetableProvider: Send + Sync {
    async fn segments(
        &self,
        from_code: &str,
        to_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleSegment>, AppError>;
}

/// Yandex Schedules API client.
#[derive(Clone)]
pub struct YandexSchedulesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    result_timezone: String,
}

impl YandexSchedulesClient {
    pub fn new(api_key: String, result_timezone: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Yandex Schedules HTTP client")?;
        Ok(Self {
            http,
            base_url: "https://api.rasp.yandex.net/v3.0".to_string(),
            api_key,
            result_timezone: result_timezone.to_string(),
        })
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Yandex Schedules rate limit hit (429)");
            }

            return Err(AppError::Timetable(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Timetable(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl TimetableProvider for YandexSchedulesClient {
    async fn segments(
        &self,
        from_code: &str,
        to_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleSegment>, AppError> {
        let url = format!("{}/search/", self.base_url);
        let date = date.format("%Y-%m-%d").to_string();
        let limit = SEARCH_LIMIT.to_string();

        tracing::debug!(from = from_code, to = to_code, date = %date, "Fetching timetable");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("format", "json"),
                ("from", from_code),
                ("to", to_code),
                ("date", date.as_str()),
                ("result_timezone", self.result_timezone.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Timetable(e.without_url().to_string()))?;

        let body: SearchResponse = self.check_response_json(response).await?;
        Ok(body.into_segments())
    }
}

/// Search response (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub segments: Vec<SearchSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSegment {
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub thread: Option<SearchThread>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchThread {
    pub uid: Option<String>,
}

fn parse_instant(raw: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(instant) => Some(instant),
        Err(e) => {
            tracing::debug!(value = raw, error = %e, "Failed to parse segment time");
            None
        }
    }
}

impl SearchResponse {
    /// Convert to provider-neutral segments. Unparseable times become
    /// `None` so the segment is dropped by candidate filtering.
    pub fn into_segments(self) -> Vec<ScheduleSegment> {
        self.segments
            .into_iter()
            .map(|s| {
                ScheduleSegment {
                    thread_id: s.thread.and_then(|t| t.uid),
                    departure: parse_instant(s.departure.as_deref()),
                    arrival: parse_instant(s.arrival.as_deref()),
                }
            })
            .collect()
    }
}
