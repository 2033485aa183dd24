//! Core data models for the swipe review client

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// A committed classification decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Aligned,
    Regret,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Aligned => "aligned",
            Outcome::Regret => "regret",
        }
    }
}

/// Classification state of a transaction as carried on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Utility {
    #[default]
    #[serde(rename = "not assigned")]
    Unset,
    #[serde(rename = "aligned")]
    Aligned,
    #[serde(rename = "regret")]
    Regret,
}

impl Utility {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Utility::Unset => None,
            Utility::Aligned => Some(Outcome::Aligned),
            Utility::Regret => Some(Outcome::Regret),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Utility::Unset)
    }
}

impl From<Outcome> for Utility {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Aligned => Utility::Aligned,
            Outcome::Regret => Utility::Regret,
        }
    }
}

//
// ================= Transactions =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub charge_name: String,
    pub amount: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub utility: Utility,
}

/// Body of `GET /swipe/unclassified/{userId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

/// Body of `POST /swipe/update`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationNotice {
    pub transaction_id: i64,
    pub utility_value: Outcome,
}

/// A transaction paired with its category emoji, for list rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DecoratedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub emoji: String,
}

/// Timestamps come from the server as ISO-8601. Offset-less values are read
/// as UTC; anything unparseable falls back to the current time.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_timestamp(&raw).unwrap_or_else(Utc::now))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

//
// ================= Session Summary =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub transaction_id: i64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub aligned: usize,
    pub regret: usize,
    pub decisions: Vec<Decision>,
}

//
// ================= Emoji =================
//

#[derive(Debug, Clone, Serialize)]
pub struct EmojiRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmojiResponse {
    pub emoji: String,
    #[serde(default)]
    pub category: Option<String>,
}

//
// ================= Coach & Goals =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoachMetrics {
    #[serde(default)]
    pub goal_name: Option<String>,
    #[serde(default)]
    pub meta_semanal: Option<f64>,
    #[serde(default)]
    pub cap_semanal: Option<f64>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunitiesResponse {
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalRequest<'a> {
    pub prompt: &'a str,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    #[serde(rename = "nombre_meta")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "monto_objetivo")]
    pub target_amount: f64,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "fecha_inicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedGoal {
    pub message: String,
    #[serde(rename = "meta")]
    pub goal: Goal,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Aligned => "Aligned",
            Outcome::Regret => "Regret",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Utility::Unset => "Not Assigned",
            Utility::Aligned => "Aligned",
            Utility::Regret => "Regret",
        };
        write!(f, "{}", s)
    }
}
