// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride search API.

use crate::error::{AppError, Result};
use crate::models::{MatchesByThread, UserId, UserSearchResult};
use crate::services::{RideSearchOutcome, RideSearchRequest};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rides", post(start_search))
        .route(
            "/api/rides/{user_id}",
            get(get_search).delete(cancel_search),
        )
        .route("/api/rides/{user_id}/matches", get(get_matches))
}

/// Start or replace a user's search.
async fn start_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RideSearchRequest>,
) -> Result<Json<RideSearchOutcome>> {
    request.validate()?;

    let outcome = state.rides.search(request).await?;
    Ok(Json(outcome))
}

/// Current live search.
async fn get_search(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserSearchResult>> {
    state
        .rides
        .current(user_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No active search for user {}", user_id)))
}

#[derive(Serialize)]
pub struct MatchesResponse {
    pub matches: MatchesByThread,
}

async fn get_matches(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Json<MatchesResponse> {
    Json(MatchesResponse {
        matches: state.rides.matches(user_id).await,
    })
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Cancel a search; `cancelled` is false if there was nothing live.
async fn cancel_search(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.rides.cancel(user_id).await,
    })
}
