//! Category emoji decoration
//!
//! Purely cosmetic: a cache in front of an optional remote lookup, with a
//! built-in table for common categories and a placeholder for the rest.
//! Nothing here affects session correctness.

use crate::models::{DecoratedTransaction, Transaction};
use crate::remote::EmojiSource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const PLACEHOLDER_EMOJI: &str = "🏷️";

/// Built-in emoji for well-known categories
pub fn builtin_emoji(category: &str) -> Option<&'static str> {
    match category.trim().to_lowercase().as_str() {
        "food" => Some("🍽️"),
        "personal care" => Some("💇"),
        "education" => Some("📚"),
        "transportation" | "transport" => Some("🚗"),
        "entertainment" => Some("🎬"),
        "fashion" => Some("👕"),
        _ => None,
    }
}

pub struct EmojiCache {
    entries: RwLock<HashMap<String, String>>,
    source: Option<Arc<dyn EmojiSource>>,
}

impl EmojiCache {
    /// Cache backed only by the built-in table
    pub fn offline() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            source: None,
        }
    }

    pub fn with_source(source: Arc<dyn EmojiSource>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            source: Some(source),
        }
    }

    pub async fn cached(&self, category: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries.get(&cache_key(category)).cloned()
    }

    /// Resolve the emoji for a category. Never fails.
    ///
    /// Order: cache, remote source, built-in table, placeholder. Remote
    /// answers and built-in hits are cached; a failed remote lookup is not,
    /// so the next call tries again.
    pub async fn lookup(&self, category: &str) -> String {
        let key = cache_key(category);
        if key.is_empty() {
            return PLACEHOLDER_EMOJI.to_string();
        }

        if let Some(hit) = self.entries.read().await.get(&key) {
            return hit.clone();
        }

        if let Some(source) = &self.source {
            match source.emoji_for(category.trim()).await {
                Ok(emoji) if !emoji.trim().is_empty() => {
                    debug!(category = %key, %emoji, "Emoji resolved remotely");
                    self.insert(key, emoji.clone()).await;
                    return emoji;
                }
                Ok(_) => warn!(category = %key, "Emoji service returned an empty emoji"),
                Err(e) => {
                    warn!(category = %key, "Emoji lookup failed: {}", e);
                    return builtin_emoji(&key).unwrap_or(PLACEHOLDER_EMOJI).to_string();
                }
            }
        }

        match builtin_emoji(&key) {
            Some(emoji) => {
                self.insert(key, emoji.to_string()).await;
                emoji.to_string()
            }
            None => PLACEHOLDER_EMOJI.to_string(),
        }
    }

    /// Pair each transaction with its category emoji. Each distinct
    /// category is resolved once.
    pub async fn decorate(&self, transactions: &[Transaction]) -> Vec<DecoratedTransaction> {
        let mut decorated = Vec::with_capacity(transactions.len());

        for transaction in transactions {
            let emoji = match transaction.category.as_deref() {
                Some(category) => self.lookup(category).await,
                None => PLACEHOLDER_EMOJI.to_string(),
            };
            decorated.push(DecoratedTransaction {
                transaction: transaction.clone(),
                emoji,
            });
        }

        decorated
    }

    async fn insert(&self, key: String, emoji: String) {
        let mut entries = self.entries.write().await;
        entries.insert(key, emoji);
    }
}

impl Default for EmojiCache {
    fn default() -> Self {
        Self::offline()
    }
}

fn cache_key(category: &str) -> String {
    category.trim().to_lowercase()
}
