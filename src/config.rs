//! Runtime configuration
//!
//! Values come from the process environment (optionally seeded from `.env`
//! by the binaries).

use crate::error::SwipeError;
use crate::gesture::DEFAULT_SWIPE_THRESHOLD;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://unitycampus.onrender.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the finance API
    pub base_url: String,
    pub user_id: i64,
    /// Horizontal displacement a drag must exceed to commit
    pub swipe_threshold: f64,
    pub http_timeout: Duration,
    pub api_port: u16,
    /// Use bundled sample transactions instead of the remote service
    pub offline: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: 1,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            http_timeout: Duration::from_secs(30),
            api_port: 8080,
            offline: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("SWIPE_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let user_id = parse_or(&lookup, "SWIPE_USER_ID", defaults.user_id)?;

        let swipe_threshold: f64 =
            parse_or(&lookup, "SWIPE_THRESHOLD", defaults.swipe_threshold)?;
        if !swipe_threshold.is_finite() || swipe_threshold < 0.0 {
            return Err(SwipeError::Config(format!(
                "SWIPE_THRESHOLD must be a non-negative number, got {}",
                swipe_threshold
            )));
        }

        let timeout_secs = parse_or(
            &lookup,
            "HTTP_TIMEOUT_SECS",
            defaults.http_timeout.as_secs(),
        )?;

        let api_port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                SwipeError::Config(format!("invalid port: {}", raw))
            })?,
            None => defaults.api_port,
        };

        let offline = lookup("SWIPE_OFFLINE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.offline);

        Ok(Self {
            base_url,
            user_id,
            swipe_threshold,
            http_timeout: Duration::from_secs(timeout_secs),
            api_port,
            offline,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SwipeError::Config(format!("invalid value for {}: {}", key, raw))),
        None => Ok(default),
    }
}
