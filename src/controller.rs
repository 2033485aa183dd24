//! Review controller - drives one swipe session
//!
//! LOADING → REVIEWING ⇄ (commit | undo) → COMPLETED → (reset) → REVIEWING
//!
//! The controller owns the session behind a single async mutex so every
//! mutation is serialized, whatever mix of gesture input and API calls
//! drives it. Notices are queued while the lock is held, so the delivery
//! order always matches the commit order; delivery itself runs on the
//! dispatcher's worker.

use crate::dispatch::NotificationDispatcher;
use crate::gesture::{self, GestureOutcome};
use crate::journal::SessionJournal;
use crate::models::{Outcome, SessionSummary, Transaction};
use crate::remote::TransactionSource;
use crate::session::Session;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ReviewState {
    Loading,
    LoadError(String),
    /// The fetch succeeded but returned nothing to review
    Empty,
    Reviewing,
    Completed,
}

/// Read-only view of the controller for rendering
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: ReviewState,
    pub total: usize,
    pub cursor: usize,
    pub remaining: usize,
    pub aligned: usize,
    pub regret: usize,
    pub can_undo: bool,
    /// Top of the card stack, current card first
    pub cards: Vec<Transaction>,
}

struct Inner {
    state: ReviewState,
    session: Session,
    /// Bumped on every load so a stale fetch cannot overwrite a newer one
    generation: u64,
}

pub struct ReviewController {
    source: Arc<dyn TransactionSource>,
    dispatcher: NotificationDispatcher,
    journal: Arc<SessionJournal>,
    user_id: i64,
    threshold: f64,
    inner: Mutex<Inner>,
}

impl ReviewController {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        dispatcher: NotificationDispatcher,
        journal: Arc<SessionJournal>,
        user_id: i64,
        threshold: f64,
    ) -> Self {
        Self {
            source,
            dispatcher,
            journal,
            user_id,
            threshold,
            inner: Mutex::new(Inner {
                state: ReviewState::Loading,
                session: Session::default(),
                generation: 0,
            }),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn journal(&self) -> &Arc<SessionJournal> {
        &self.journal
    }

    /// Fetch the unclassified queue and start a fresh session.
    ///
    /// Also serves as the retry action from `LoadError`. One attempt, no
    /// backoff; a failure lands in `LoadError` with a readable message.
    pub async fn load(&self) -> ReviewState {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.state = ReviewState::Loading;
            inner.generation
        };

        info!(user_id = self.user_id, "Loading unclassified transactions");
        let fetched = self.source.fetch_unclassified(self.user_id).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(generation, "Discarding result of superseded load");
            return inner.state.clone();
        }

        inner.state = match fetched {
            Ok(transactions) if transactions.is_empty() => {
                info!(user_id = self.user_id, "No transactions to review");
                inner.session = Session::default();
                ReviewState::Empty
            }
            Ok(transactions) => {
                info!(
                    user_id = self.user_id,
                    count = transactions.len(),
                    "Review session started"
                );
                inner.session = Session::new(transactions);
                ReviewState::Reviewing
            }
            Err(e) => {
                warn!(user_id = self.user_id, "Failed to load transactions: {}", e);
                inner.session = Session::default();
                ReviewState::LoadError(e.load_message())
            }
        };

        inner.state.clone()
    }

    /// Interpret a finished drag and commit if it crossed the threshold.
    pub async fn apply_gesture(&self, displacement: f64) -> GestureOutcome {
        let gesture = gesture::interpret(displacement, self.threshold);

        match gesture {
            GestureOutcome::Commit(outcome) => {
                self.commit(outcome).await;
            }
            GestureOutcome::SnapBack => debug!(displacement, "Gesture snapped back"),
        }

        gesture
    }

    /// Classify the current card. Ignored outside `Reviewing`.
    pub async fn commit(&self, outcome: Outcome) -> ReviewState {
        let (completed, state) = {
            let mut inner = self.inner.lock().await;

            if inner.state != ReviewState::Reviewing {
                debug!(state = ?inner.state, "Commit ignored outside review");
                return inner.state.clone();
            }

            let charge_name = inner
                .session
                .current()
                .map(|tx| tx.charge_name.clone())
                .unwrap_or_default();

            let Some(notice) = inner.session.commit(outcome) else {
                return inner.state.clone();
            };

            info!(
                transaction_id = notice.transaction_id,
                charge = %charge_name,
                outcome = outcome.as_str(),
                "Transaction classified"
            );

            // Queue under the lock: a later commit of the same card must not
            // overtake this one.
            self.dispatcher.dispatch(notice);

            let completed = if inner.session.is_complete() {
                inner.state = ReviewState::Completed;
                Some(inner.session.summarize())
            } else {
                None
            };

            (completed, inner.state.clone())
        };

        if let Some(summary) = completed {
            info!(
                user_id = self.user_id,
                total = summary.total,
                aligned = summary.aligned,
                regret = summary.regret,
                "Review session completed"
            );
            self.journal.append(self.user_id, summary).await;
        }

        state
    }

    /// Reverse the last commit. Only valid while reviewing; the remote
    /// service is not told about the reversal.
    pub async fn undo(&self) -> ReviewState {
        let mut inner = self.inner.lock().await;

        if inner.state != ReviewState::Reviewing {
            debug!(state = ?inner.state, "Undo ignored outside review");
            return inner.state.clone();
        }

        if let Some(record) = inner.session.undo() {
            info!(
                transaction_id = record.transaction_id,
                outcome = record.outcome.as_str(),
                "Classification undone"
            );
        }

        inner.state.clone()
    }

    /// Restart review of the same list with every outcome cleared.
    pub async fn reset(&self) -> ReviewState {
        let mut inner = self.inner.lock().await;

        match inner.state {
            ReviewState::Reviewing | ReviewState::Completed => {
                inner.session.reset();
                inner.state = ReviewState::Reviewing;
                info!(user_id = self.user_id, "Review session reset");
            }
            _ => debug!(state = ?inner.state, "Reset ignored without a loaded session"),
        }

        inner.state.clone()
    }

    pub async fn summarize(&self) -> SessionSummary {
        self.inner.lock().await.session.summarize()
    }

    pub async fn state(&self) -> ReviewState {
        self.inner.lock().await.state.clone()
    }

    /// Copy of the underlying session
    pub async fn session(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        let session = &inner.session;
        let reviewing = inner.state == ReviewState::Reviewing;

        SessionSnapshot {
            state: inner.state.clone(),
            total: session.len(),
            cursor: session.cursor(),
            remaining: session.remaining(),
            aligned: session.aligned_count(),
            regret: session.regret_count(),
            can_undo: reviewing && session.can_undo(),
            cards: if reviewing {
                session.visible().to_vec()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dispatch::tests::RecordingSink;
    use crate::error::SwipeError;
    use crate::models::Utility;
    use crate::remote::client::tests::{client_for, sample_payload, spawn_mock};
    use crate::remote::StaticTransactionSource;
    use crate::Result;
    use axum::{response::IntoResponse, routing::get, Json, Router};
    use chrono::Utc;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinHandle;

    pub(crate) fn tx(id: i64, name: &str) -> Transaction {
        Transaction {
            id,
            charge_name: name.to_string(),
            amount: 20.0,
            location: Some("Online".to_string()),
            category: Some("entertainment".to_string()),
            timestamp: Utc::now(),
            utility: Utility::Unset,
        }
    }

    /// Source that replays a scripted sequence of fetch results
    struct ScriptedSource {
        responses: std::sync::Mutex<VecDeque<Result<Vec<Transaction>>>>,
    }

    #[async_trait::async_trait]
    impl TransactionSource for ScriptedSource {
        async fn fetch_unclassified(&self, _user_id: i64) -> Result<Vec<Transaction>> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn controller_with(
        source: Arc<dyn TransactionSource>,
        sink: Arc<RecordingSink>,
    ) -> (ReviewController, JoinHandle<()>) {
        let (dispatcher, handle) = NotificationDispatcher::spawn(sink);
        let controller = ReviewController::new(
            source,
            dispatcher,
            Arc::new(SessionJournal::new()),
            1,
            100.0,
        );
        (controller, handle)
    }

    fn abc_source() -> Arc<dyn TransactionSource> {
        Arc::new(StaticTransactionSource::new(vec![
            tx(1, "A"),
            tx(2, "B"),
            tx(3, "C"),
        ]))
    }

    fn numbered_source(count: i64) -> Arc<dyn TransactionSource> {
        Arc::new(StaticTransactionSource::new(
            (1..=count).map(|id| tx(id, "Card")).collect(),
        ))
    }

    fn delivered(sink: &RecordingSink) -> Vec<(i64, Outcome)> {
        sink.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|n| (n.transaction_id, n.utility_value))
            .collect()
    }

    #[tokio::test]
    async fn test_full_review_scenario() {
        let sink = Arc::new(RecordingSink::default());
        let (controller, handle) = controller_with(abc_source(), sink.clone());

        assert_eq!(controller.state().await, ReviewState::Loading);
        assert_eq!(controller.load().await, ReviewState::Reviewing);

        controller.commit(Outcome::Aligned).await;
        controller.commit(Outcome::Regret).await;
        controller.undo().await;

        let snapshot = controller.snapshot().await;
        assert_eq!((snapshot.cursor, snapshot.aligned, snapshot.regret), (1, 1, 0));
        assert_eq!(snapshot.cards[0].charge_name, "B");
        assert_eq!(snapshot.cards[0].utility, Utility::Unset);

        controller.commit(Outcome::Aligned).await;
        assert_eq!(controller.commit(Outcome::Regret).await, ReviewState::Completed);

        let summary = controller.summarize().await;
        assert_eq!((summary.total, summary.aligned, summary.regret), (3, 2, 1));

        let journaled = controller.journal().history(1).await;
        assert_eq!(journaled.len(), 1);
        assert_eq!(journaled[0].record.summary, summary);
        assert!(journaled[0].verified);

        drop(controller);
        handle.await.unwrap();

        // Four commits were sent; the undone one is not retracted remotely.
        assert_eq!(
            delivered(&sink),
            vec![
                (1, Outcome::Aligned),
                (2, Outcome::Regret),
                (2, Outcome::Aligned),
                (3, Outcome::Regret),
            ]
        );
    }

    #[tokio::test]
    async fn test_gestures_drive_commits() {
        let sink = Arc::new(RecordingSink::default());
        let (controller, _handle) = controller_with(abc_source(), sink);
        controller.load().await;

        assert_eq!(controller.apply_gesture(100.0).await, GestureOutcome::SnapBack);
        assert_eq!(controller.session().await.cursor(), 0);

        assert_eq!(
            controller.apply_gesture(-180.0).await,
            GestureOutcome::Commit(Outcome::Regret)
        );
        assert_eq!(
            controller.apply_gesture(180.0).await,
            GestureOutcome::Commit(Outcome::Aligned)
        );

        let session = controller.session().await;
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.regret_count(), 1);
        assert_eq!(session.aligned_count(), 1);
    }

    #[tokio::test]
    async fn test_completed_is_terminal_until_reset() {
        let sink = Arc::new(RecordingSink::default());
        let (controller, _handle) = controller_with(abc_source(), sink);
        controller.load().await;

        for _ in 0..3 {
            controller.commit(Outcome::Aligned).await;
        }
        assert_eq!(controller.state().await, ReviewState::Completed);

        assert_eq!(controller.undo().await, ReviewState::Completed);
        assert_eq!(controller.commit(Outcome::Regret).await, ReviewState::Completed);
        assert_eq!(controller.session().await.cursor(), 3);
        assert!(!controller.snapshot().await.can_undo);

        assert_eq!(controller.reset().await, ReviewState::Reviewing);
        let session = controller.session().await;
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.len(), 3);
        assert!(session.transactions().iter().all(|t| t.utility.is_unset()));
    }

    #[tokio::test]
    async fn test_failed_notifications_keep_local_state() {
        let sink = Arc::new(RecordingSink {
            fail_ids: vec![1, 2, 3],
            ..Default::default()
        });
        let (controller, handle) = controller_with(abc_source(), sink.clone());
        controller.load().await;

        controller.commit(Outcome::Aligned).await;
        controller.commit(Outcome::Regret).await;

        let session = controller.session().await;
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.aligned_count(), 1);
        assert_eq!(session.regret_count(), 1);

        drop(controller);
        handle.await.unwrap();
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_fetch_skips_review() {
        let sink = Arc::new(RecordingSink::default());
        let source = Arc::new(StaticTransactionSource::new(vec![]));
        let (controller, _handle) = controller_with(source, sink);

        assert_eq!(controller.load().await, ReviewState::Empty);
        assert_eq!(controller.commit(Outcome::Aligned).await, ReviewState::Empty);
        assert_eq!(controller.reset().await, ReviewState::Empty);
        assert!(controller.snapshot().await.cards.is_empty());
    }

    #[tokio::test]
    async fn test_load_error_then_retry() {
        let sink = Arc::new(RecordingSink::default());
        let source = Arc::new(ScriptedSource {
            responses: std::sync::Mutex::new(VecDeque::from(vec![
                Err(SwipeError::Network("connection refused".to_string())),
                Ok(vec![tx(9, "Gas Station")]),
            ])),
        });
        let (controller, _handle) = controller_with(source, sink);

        match controller.load().await {
            ReviewState::LoadError(message) => assert!(message.contains("connection refused")),
            other => panic!("expected LoadError, got {:?}", other),
        }
        assert!(matches!(
            controller.commit(Outcome::Aligned).await,
            ReviewState::LoadError(_)
        ));

        assert_eq!(controller.load().await, ReviewState::Reviewing);
        assert_eq!(controller.snapshot().await.cards[0].id, 9);
    }

    #[tokio::test]
    async fn test_malformed_payload_then_retry_refetches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/swipe/unclassified/:user_id",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        "{\"transactions\": [oops".into_response()
                    } else {
                        Json(sample_payload()).into_response()
                    }
                }
            }),
        );
        let client = Arc::new(client_for(&spawn_mock(router).await));
        let sink = Arc::new(RecordingSink::default());
        let (controller, _handle) = controller_with(client, sink);

        match controller.load().await {
            ReviewState::LoadError(message) => {
                assert!(message.starts_with("Could not read transactions"))
            }
            other => panic!("expected LoadError, got {:?}", other),
        }

        assert_eq!(controller.load().await, ReviewState::Reviewing);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(controller.snapshot().await.total, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_commits_are_serialized() {
        const CARDS: i64 = 64;
        let sink = Arc::new(RecordingSink::default());
        let (controller, handle) = controller_with(numbered_source(CARDS), sink.clone());
        let controller = Arc::new(controller);
        controller.load().await;

        let tasks: Vec<_> = (0..CARDS)
            .map(|i| {
                let controller = controller.clone();
                let outcome = if i % 3 == 0 {
                    Outcome::Regret
                } else {
                    Outcome::Aligned
                };
                tokio::spawn(async move { controller.commit(outcome).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let session = controller.session().await;
        assert_eq!(session.cursor(), CARDS as usize);
        assert_eq!(
            session.aligned_count() + session.regret_count(),
            session.cursor()
        );
        assert_eq!(session.regret_count(), 22);
        assert_eq!(controller.state().await, ReviewState::Completed);
        assert_eq!(controller.journal().history(1).await.len(), 1);

        drop(controller);
        handle.await.unwrap();

        // One notice per card, in card order.
        let ids: Vec<i64> = delivered(&sink).iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, (1..=CARDS).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_commits_and_undos_stay_consistent() {
        let sink = Arc::new(RecordingSink::default());
        let (controller, handle) = controller_with(numbered_source(64), sink.clone());
        let controller = Arc::new(controller);
        controller.load().await;

        // 48 commits and 16 undos racing on one session
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let controller = controller.clone();
                tokio::spawn(async move {
                    match i % 4 {
                        0 => controller.undo().await,
                        1 => controller.commit(Outcome::Regret).await,
                        _ => controller.commit(Outcome::Aligned).await,
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let session = controller.session().await;
        assert_eq!(
            session.aligned_count() + session.regret_count(),
            session.cursor()
        );
        assert!((32..=48).contains(&session.cursor()));
        assert_eq!(controller.state().await, ReviewState::Reviewing);

        drop(controller);
        handle.await.unwrap();

        let delivered = delivered(&sink);
        assert_eq!(delivered.len(), 48);

        // Applying the notices in arrival order reproduces the local outcomes,
        // including cards that were undone and classified again.
        let mut remote: HashMap<i64, Outcome> = HashMap::new();
        for (id, outcome) in &delivered {
            remote.insert(*id, *outcome);
        }
        for transaction in &session.transactions()[..session.cursor()] {
            assert_eq!(
                transaction.utility.outcome(),
                remote.get(&transaction.id).copied()
            );
        }
    }
}
