//! HTTP client for the finance API
//!
//! One long-lived reqwest::Client is shared by every call for connection
//! pooling. Transport failures map to `Network`, unreadable bodies to
//! `Decode`, and non-2xx responses to `Api`.

use super::{ClassificationSink, EmojiSource, TransactionSource};
use crate::config::AppConfig;
use crate::error::SwipeError;
use crate::models::{
    ClassificationNotice, CoachMetrics, CreatedGoal, EmojiRequest, EmojiResponse,
    OpportunitiesResponse, Opportunity, Transaction, TransactionsResponse, GoalRequest,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct SwipeApiClient {
    client: Client,
    base_url: String,
}

impl SwipeApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.base_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.url(path));
        self.send_json(path, request).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        self.send_json(path, request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let text = self.execute(path, request).await?;

        serde_json::from_str(&text).map_err(|e| {
            error!(path, "Failed to decode response: {}", e);
            SwipeError::Decode(e.to_string())
        })
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<String> {
        debug!(path, "Calling finance API");

        let response = request.send().await.map_err(|e| {
            error!(path, "Finance API request failed: {}", e);
            SwipeError::Network(format!("{} failed: {}", path, e))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SwipeError::Network(format!("{} body read failed: {}", path, e)))?;

        if !status.is_success() {
            error!(path, status = status.as_u16(), "Finance API error response: {}", text);
            return Err(SwipeError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    /// `GET /swipe/unclassified/{userId}`
    pub async fn unclassified(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let response: TransactionsResponse = self
            .get_json(&format!("/swipe/unclassified/{}", user_id))
            .await?;

        info!(user_id, count = response.transactions.len(), "Fetched unclassified transactions");
        Ok(response.transactions)
    }

    /// `POST /swipe/update`. The response body is not inspected.
    pub async fn update_utility(&self, notice: &ClassificationNotice) -> Result<()> {
        let request = self.client.post(self.url("/swipe/update")).json(notice);
        self.execute("/swipe/update", request).await?;
        Ok(())
    }

    /// `POST /emojis`
    pub async fn emoji(&self, category: &str) -> Result<String> {
        let response: EmojiResponse = self
            .post_json("/emojis", &EmojiRequest { prompt: category })
            .await?;
        Ok(response.emoji)
    }

    /// `GET /coach/{userId}`
    pub async fn coach_metrics(&self, user_id: i64) -> Result<CoachMetrics> {
        self.get_json(&format!("/coach/{}", user_id)).await
    }

    /// `GET /coach/{userId}/opportunities`
    pub async fn opportunities(&self, user_id: i64) -> Result<Vec<Opportunity>> {
        let response: OpportunitiesResponse = self
            .get_json(&format!("/coach/{}/opportunities", user_id))
            .await?;
        Ok(response.opportunities)
    }

    /// `POST /metas`: the server turns a free-text prompt into a goal.
    pub async fn create_goal(&self, prompt: &str, user_id: i64) -> Result<CreatedGoal> {
        if prompt.trim().is_empty() {
            return Err(SwipeError::PreconditionViolation(
                "goal prompt must not be empty".to_string(),
            ));
        }

        let created: CreatedGoal = self
            .post_json("/metas", &GoalRequest { prompt, user_id })
            .await?;

        info!(user_id, goal = %created.goal.name, "Goal created");
        Ok(created)
    }
}

#[async_trait]
impl TransactionSource for SwipeApiClient {
    async fn fetch_unclassified(&self, user_id: i64) -> Result<Vec<Transaction>> {
        self.unclassified(user_id).await
    }
}

#[async_trait]
impl ClassificationSink for SwipeApiClient {
    async fn send(&self, notice: &ClassificationNotice) -> Result<()> {
        self.update_utility(notice).await
    }
}

#[async_trait]
impl EmojiSource for SwipeApiClient {
    async fn emoji_for(&self, category: &str) -> Result<String> {
        self.emoji(category).await
    }
}
