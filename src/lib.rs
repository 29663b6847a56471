// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ride matcher: commuters who want to arrive at the same time find out
//! which trains they share.
//!
//! This crate provides the search store, the overlap matcher, the arrival
//! window resolver, and a small HTTP API over them.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::RideSearchService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub rides: RideSearchService,
}
