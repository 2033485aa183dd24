//! Swipe review session state
//!
//! A session is a fixed, ordered list of transactions plus a cursor pointing
//! at the next card awaiting a decision. Committing classifies the card under
//! the cursor and advances; undoing rewinds the last commit exactly.
//!
//! Invariant: `aligned_count + regret_count == cursor`, and the two counters
//! equal the tallies of committed outcomes in `transactions[..cursor]`.
//!
//! Everything here is synchronous and side-effect free. Remote notification
//! is the caller's job: `commit` hands back the notice to dispatch.

use crate::models::{ClassificationNotice, Decision, Outcome, SessionSummary, Transaction, Utility};
use serde::Serialize;
use tracing::debug;

/// Number of cards rendered in the stack (top card plus two behind it)
pub const VISIBLE_CARDS: usize = 3;

/// One entry on the undo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub index: usize,
    pub transaction_id: i64,
    pub previous: Utility,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    transactions: Vec<Transaction>,
    cursor: usize,
    aligned_count: usize,
    regret_count: usize,
    history: Vec<CommitRecord>,
}

impl Session {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Self::default()
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn aligned_count(&self) -> usize {
        self.aligned_count
    }

    pub fn regret_count(&self) -> usize {
        self.regret_count
    }

    /// Cards still waiting for a decision
    pub fn remaining(&self) -> usize {
        self.transactions.len() - self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.transactions.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// The card under the cursor, if any.
    pub fn current(&self) -> Option<&Transaction> {
        self.transactions.get(self.cursor)
    }

    /// The top of the card stack, at most [`VISIBLE_CARDS`] long.
    pub fn visible(&self) -> &[Transaction] {
        let end = (self.cursor + VISIBLE_CARDS).min(self.transactions.len());
        &self.transactions[self.cursor..end]
    }

    /// Classify the card under the cursor and advance.
    ///
    /// Returns the notice to forward to the remote service, or `None` when
    /// the session is already exhausted (the call is ignored).
    pub fn commit(&mut self, outcome: Outcome) -> Option<ClassificationNotice> {
        let index = self.cursor;
        let Some(transaction) = self.transactions.get_mut(index) else {
            debug!(cursor = index, "Commit past end of session ignored");
            return None;
        };

        let previous = transaction.utility;
        transaction.utility = outcome.into();
        let transaction_id = transaction.id;

        match outcome {
            Outcome::Aligned => self.aligned_count += 1,
            Outcome::Regret => self.regret_count += 1,
        }
        self.cursor += 1;
        self.history.push(CommitRecord {
            index,
            transaction_id,
            previous,
            outcome,
        });

        Some(ClassificationNotice {
            transaction_id,
            utility_value: outcome,
        })
    }

    /// Reverse the most recent commit. No-op when nothing has been committed.
    pub fn undo(&mut self) -> Option<CommitRecord> {
        let Some(record) = self.history.pop() else {
            debug!("Undo with empty history ignored");
            return None;
        };

        self.cursor = record.index;
        self.transactions[record.index].utility = record.previous;
        match record.outcome {
            Outcome::Aligned => self.aligned_count -= 1,
            Outcome::Regret => self.regret_count -= 1,
        }

        Some(record)
    }

    /// Start over on the same list: cursor to zero, every outcome cleared.
    pub fn reset(&mut self) {
        for transaction in &mut self.transactions {
            transaction.utility = Utility::Unset;
        }
        self.cursor = 0;
        self.aligned_count = 0;
        self.regret_count = 0;
        self.history.clear();
    }

    pub fn summarize(&self) -> SessionSummary {
        let decisions = self.transactions[..self.cursor]
            .iter()
            .filter_map(|tx| {
                tx.utility.outcome().map(|outcome| Decision {
                    transaction_id: tx.id,
                    outcome,
                })
            })
            .collect();

        SessionSummary {
            total: self.transactions.len(),
            aligned: self.aligned_count,
            regret: self.regret_count,
            decisions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tx(id: i64, name: &str) -> Transaction {
        Transaction {
            id,
            charge_name: name.to_string(),
            amount: 10.0 + id as f64,
            location: Some("Downtown Plaza".to_string()),
            category: Some("food".to_string()),
            timestamp: chrono::DateTime::<Utc>::UNIX_EPOCH,
            utility: Utility::Unset,
        }
    }

    fn abc() -> Session {
        Session::new(vec![tx(1, "A"), tx(2, "B"), tx(3, "C")])
    }

    fn assert_counter_invariant(session: &Session) {
        assert_eq!(
            session.aligned_count() + session.regret_count(),
            session.cursor()
        );
        let prefix = &session.transactions()[..session.cursor()];
        let aligned = prefix.iter().filter(|t| t.utility == Utility::Aligned).count();
        let regret = prefix.iter().filter(|t| t.utility == Utility::Regret).count();
        assert_eq!(session.aligned_count(), aligned);
        assert_eq!(session.regret_count(), regret);
    }

    #[test]
    fn test_commit_advances_and_counts() {
        let mut session = abc();
        let notice = session.commit(Outcome::Aligned).unwrap();

        assert_eq!(notice.transaction_id, 1);
        assert_eq!(notice.utility_value, Outcome::Aligned);
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.aligned_count(), 1);
        assert_eq!(session.transactions()[0].utility, Utility::Aligned);
        assert_eq!(session.current().unwrap().charge_name, "B");
        assert_eq!(session.remaining(), 2);
        assert_counter_invariant(&session);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut session = abc();

        session.commit(Outcome::Aligned);
        assert_eq!((session.cursor(), session.aligned_count()), (1, 1));

        session.commit(Outcome::Regret);
        assert_eq!((session.cursor(), session.regret_count()), (2, 1));

        session.undo();
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.regret_count(), 0);
        assert_eq!(session.transactions()[1].utility, Utility::Unset);

        session.commit(Outcome::Aligned);
        assert_eq!((session.cursor(), session.aligned_count()), (2, 2));

        assert!(!session.is_complete());
        session.commit(Outcome::Regret);
        assert_eq!(session.cursor(), 3);
        assert!(session.is_complete());
        assert_counter_invariant(&session);

        let summary = session.summarize();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.aligned, 2);
        assert_eq!(summary.regret, 1);
        assert_eq!(
            summary.decisions,
            vec![
                Decision { transaction_id: 1, outcome: Outcome::Aligned },
                Decision { transaction_id: 2, outcome: Outcome::Aligned },
                Decision { transaction_id: 3, outcome: Outcome::Regret },
            ]
        );
    }

    #[test]
    fn test_undo_round_trip() {
        for outcome in [Outcome::Aligned, Outcome::Regret] {
            for prefix in 0..3 {
                let mut session = abc();
                for _ in 0..prefix {
                    session.commit(Outcome::Regret);
                }
                let before = session.clone();

                session.commit(outcome);
                session.undo();
                assert_eq!(session, before);
            }
        }
    }

    #[test]
    fn test_undo_restores_previous_server_value() {
        let mut first = tx(1, "A");
        first.utility = Utility::Regret;
        let mut session = Session::new(vec![first]);
        let before = session.clone();

        session.commit(Outcome::Aligned);
        assert_eq!(session.transactions()[0].utility, Utility::Aligned);

        let record = session.undo().unwrap();
        assert_eq!(record.previous, Utility::Regret);
        assert_eq!(record.transaction_id, 1);
        assert_eq!(session, before);
    }

    #[test]
    fn test_preconditions_are_ignored() {
        let mut session = abc();
        assert!(session.undo().is_none());
        assert_eq!(session, abc());

        for _ in 0..3 {
            session.commit(Outcome::Aligned);
        }
        let done = session.clone();
        assert!(session.commit(Outcome::Regret).is_none());
        assert_eq!(session, done);
    }

    #[test]
    fn test_completion_iff_cursor_at_end() {
        let mut session = abc();
        for step in 0..3 {
            assert!(!session.is_complete(), "complete early at step {}", step);
            session.commit(Outcome::Aligned);
        }
        assert!(session.is_complete());
        assert!(session.current().is_none());
    }

    #[test]
    fn test_reset_clears_outcomes_keeps_list() {
        let mut session = abc();
        session.commit(Outcome::Aligned);
        session.commit(Outcome::Regret);
        session.commit(Outcome::Aligned);
        assert!(session.is_complete());

        session.reset();
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.aligned_count(), 0);
        assert_eq!(session.regret_count(), 0);
        assert!(!session.can_undo());
        assert_eq!(session, abc());
        assert!(session.summarize().decisions.is_empty());
    }

    #[test]
    fn test_visible_stack() {
        let mut session = Session::new((1..=5).map(|i| tx(i, "x")).collect());
        assert_eq!(session.visible().len(), 3);
        assert_eq!(session.visible()[0].id, 1);

        for _ in 0..3 {
            session.commit(Outcome::Aligned);
        }
        let ids: Vec<i64> = session.visible().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn test_empty_session_is_complete() {
        let mut session = Session::new(vec![]);
        assert!(session.is_empty());
        assert!(session.is_complete());
        assert!(session.commit(Outcome::Aligned).is_none());
        assert_eq!(session.summarize().total, 0);
    }
}
