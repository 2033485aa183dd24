//! Journal of completed review sessions
//!
//! Each user's completed sessions form an append-only chain. A record's
//! fingerprint covers its own decisions plus the fingerprint of the record
//! before it, so editing or dropping an earlier entry shows up when the
//! history is read back. Every read re-checks the links.

use crate::models::SessionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub record_id: Uuid,
    pub user_id: i64,
    /// Position in the user's chain, starting at 1
    pub sequence: u64,
    pub summary: SessionSummary,
    pub completed_at: DateTime<Utc>,
    pub previous_fingerprint: Option<String>,
    pub fingerprint: String,
}

impl SessionRecord {
    /// SHA-256 over the chain link and every field that describes the session
    pub fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.previous_fingerprint.as_deref().unwrap_or("").as_bytes());
        hasher.update(self.record_id.as_bytes());
        hasher.update(self.user_id.to_be_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.completed_at.to_rfc3339().as_bytes());
        hasher.update(format!(
            "{}:{}:{}",
            self.summary.total, self.summary.aligned, self.summary.regret
        ));
        for decision in &self.summary.decisions {
            hasher.update(decision.transaction_id.to_be_bytes());
            hasher.update(decision.outcome.as_str().as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// A record as handed to readers, with the result of re-checking its link
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    #[serde(flatten)]
    pub record: SessionRecord,
    pub verified: bool,
}

#[derive(Default)]
pub struct SessionJournal {
    chains: RwLock<HashMap<i64, Vec<SessionRecord>>>,
}

impl SessionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed session to the user's chain
    pub async fn append(&self, user_id: i64, summary: SessionSummary) -> SessionRecord {
        let mut chains = self.chains.write().await;
        let chain = chains.entry(user_id).or_default();

        let mut record = SessionRecord {
            record_id: Uuid::new_v4(),
            user_id,
            sequence: chain.len() as u64 + 1,
            summary,
            completed_at: Utc::now(),
            previous_fingerprint: chain.last().map(|last| last.fingerprint.clone()),
            fingerprint: String::new(),
        };
        record.fingerprint = record.compute_fingerprint();
        chain.push(record.clone());

        debug!(
            user_id,
            sequence = record.sequence,
            record_id = %record.record_id,
            "Session journaled"
        );
        record
    }

    /// The user's completed sessions, oldest first
    pub async fn history(&self, user_id: i64) -> Vec<JournalEntry> {
        let chains = self.chains.read().await;
        let Some(chain) = chains.get(&user_id) else {
            return Vec::new();
        };

        chain
            .iter()
            .enumerate()
            .map(|(position, record)| JournalEntry {
                verified: verify_link(chain, position),
                record: record.clone(),
            })
            .collect()
    }

    pub async fn entry(&self, record_id: Uuid) -> Option<JournalEntry> {
        let chains = self.chains.read().await;

        chains.values().find_map(|chain| {
            let position = chain.iter().position(|r| r.record_id == record_id)?;
            Some(JournalEntry {
                verified: verify_link(chain, position),
                record: chain[position].clone(),
            })
        })
    }

    #[cfg(test)]
    async fn with_record_mut<F>(&self, user_id: i64, position: usize, edit: F)
    where
        F: FnOnce(&mut SessionRecord),
    {
        let mut chains = self.chains.write().await;
        if let Some(record) = chains.get_mut(&user_id).and_then(|c| c.get_mut(position)) {
            edit(record);
        }
    }
}

fn verify_link(chain: &[SessionRecord], position: usize) -> bool {
    let record = &chain[position];
    let expected_previous = position
        .checked_sub(1)
        .map(|prev| chain[prev].fingerprint.as_str());

    let linked = record.previous_fingerprint.as_deref() == expected_previous;
    let intact = record.compute_fingerprint() == record.fingerprint;

    if !(linked && intact) {
        warn!(
            user_id = record.user_id,
            sequence = record.sequence,
            linked,
            intact,
            "Journal record failed verification"
        );
    }
    linked && intact
}
