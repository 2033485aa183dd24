//! Coaching feed and goal progress
//!
//! The coach metrics and savings opportunities are computed server-side;
//! this module fetches them together and derives the countdown figures the
//! goal card displays.

use crate::models::{CoachMetrics, Goal, Opportunity};
use crate::remote::SwipeApiClient;
use crate::Result;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

/// Goal amount assumed when the coach has a goal name but no weekly target
const DEFAULT_GOAL_AMOUNT: f64 = 1000.0;
/// Window assumed for a goal known only through coach metrics
const INFERRED_GOAL_LOOKBACK_DAYS: i64 = 7;
const INFERRED_GOAL_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub name: String,
    pub goal_amount: f64,
    /// Fraction of the goal already reached, 0.0..=1.0
    pub progress: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl GoalProgress {
    pub fn from_goal(goal: &Goal, progress: f64) -> Self {
        Self {
            name: goal.name.clone(),
            goal_amount: goal.target_amount,
            progress: progress.clamp(0.0, 1.0),
            start_date: goal.start_date,
            end_date: goal.end_date,
        }
    }

    /// Build a goal from the coach metrics alone. `None` when the coach
    /// reports no active goal.
    pub fn from_metrics(metrics: &CoachMetrics, today: NaiveDate) -> Option<Self> {
        let name = metrics.goal_name.clone()?;

        Some(Self {
            name,
            goal_amount: metrics.meta_semanal.unwrap_or(DEFAULT_GOAL_AMOUNT),
            progress: metrics.progress.unwrap_or(0.0).clamp(0.0, 1.0),
            start_date: today - Duration::days(INFERRED_GOAL_LOOKBACK_DAYS),
            end_date: today + Duration::days(INFERRED_GOAL_HORIZON_DAYS),
        })
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days().max(0)
    }

    pub fn amount_remaining(&self) -> f64 {
        self.goal_amount * (1.0 - self.progress)
    }

    /// Whole currency units to set aside per day to finish on time
    pub fn suggested_daily_amount(&self, today: NaiveDate) -> i64 {
        let days = self.days_remaining(today).max(1);
        (self.amount_remaining() / days as f64).floor() as i64
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoachFeed {
    pub metrics: CoachMetrics,
    pub opportunities: Vec<Opportunity>,
}

impl CoachFeed {
    pub fn goal_progress(&self, today: NaiveDate) -> Option<GoalProgress> {
        GoalProgress::from_metrics(&self.metrics, today)
    }
}

/// Fetch metrics and opportunities concurrently. Metrics are required;
/// an opportunities failure degrades to an empty list.
pub async fn load_feed(client: &SwipeApiClient, user_id: i64) -> Result<CoachFeed> {
    let (metrics, opportunities) =
        tokio::join!(client.coach_metrics(user_id), client.opportunities(user_id));

    let metrics = metrics?;
    let opportunities = opportunities.unwrap_or_else(|e| {
        warn!(user_id, "Failed to load coach opportunities: {}", e);
        Vec::new()
    });

    info!(
        user_id,
        goal = ?metrics.goal_name,
        opportunities = opportunities.len(),
        "Coach feed loaded"
    );

    Ok(CoachFeed {
        metrics,
        opportunities,
    })
}
