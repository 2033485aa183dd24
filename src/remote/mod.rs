//! Remote service seams
//!
//! The session only talks to the outside world through these traits. The
//! HTTP client implements all of them; the static implementations keep the
//! app usable offline and in tests.

use crate::models::{ClassificationNotice, Transaction, Utility};
use crate::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;

pub mod client;
pub use client::SwipeApiClient;

/// Supplies the queue of transactions awaiting classification
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_unclassified(&self, user_id: i64) -> Result<Vec<Transaction>>;
}

/// Receives classification decisions. Delivery is one-way.
#[async_trait]
pub trait ClassificationSink: Send + Sync {
    async fn send(&self, notice: &ClassificationNotice) -> Result<()>;
}

/// Resolves a category name to a display emoji
#[async_trait]
pub trait EmojiSource: Send + Sync {
    async fn emoji_for(&self, category: &str) -> Result<String>;
}

/// Fixed transaction list, served on every fetch
pub struct StaticTransactionSource {
    transactions: Vec<Transaction>,
}

impl StaticTransactionSource {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// The sample card deck used when running without a server.
    pub fn demo() -> Self {
        let now = Utc::now();
        let sample = [
            ("Starbucks Coffee", 1, 5.45, "Downtown Plaza", "food"),
            ("Uber Ride", 2, 12.30, "Main St to Airport", "transportation"),
            ("Target", 24, 45.67, "Target Center", "fashion"),
            ("Netflix Subscription", 48, 15.99, "Online", "entertainment"),
            ("Gas Station", 72, 32.50, "Shell Station", "transport"),
            ("Restaurant", 96, 28.75, "Olive Garden", "food"),
        ];

        let transactions = sample
            .iter()
            .enumerate()
            .map(|(i, (name, hours_ago, amount, location, category))| Transaction {
                id: i as i64 + 1,
                charge_name: name.to_string(),
                amount: *amount,
                location: Some(location.to_string()),
                category: Some(category.to_string()),
                timestamp: now - Duration::hours(*hours_ago),
                utility: Utility::Unset,
            })
            .collect();

        Self { transactions }
    }
}

#[async_trait]
impl TransactionSource for StaticTransactionSource {
    async fn fetch_unclassified(&self, _user_id: i64) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }
}

/// Sink that only logs; used when no server is configured
pub struct LoggingSink;

#[async_trait]
impl ClassificationSink for LoggingSink {
    async fn send(&self, notice: &ClassificationNotice) -> Result<()> {
        info!(
            transaction_id = notice.transaction_id,
            utility = notice.utility_value.as_str(),
            "Classification recorded locally (offline)"
        );
        Ok(())
    }
}
