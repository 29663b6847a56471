// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound messaging to riders.

use crate::error::AppError;
use crate::models::UserId;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a text message to a user's chat.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), AppError>;
}

/// Telegram Bot API gateway. Chat id equals user id for private chats.
#[derive(Clone)]
pub struct TelegramGateway {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramGateway {
    pub fn new(token: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Telegram HTTP client")?;
        Ok(Self {
            http,
            base_url: "https://api.telegram.org".to_string(),
            token: Some(token),
        })
    }

    /// Gateway without a bot token; every send fails before any I/O.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token: None,
        }
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), AppError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Gateway("Telegram bot token not configured".to_string()))?;

        let url = format!("{}/bot{}/sendMessage", self.base_url, token);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": user_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.without_url().to_string()))?;

        let status = response.status();
        let body: BotApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("HTTP {}: {}", status, e.without_url())))?;

        if !body.ok {
            return Err(AppError::Gateway(format!(
                "HTTP {}: {}",
                status,
                body.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}
