//! Fire-and-forget delivery of classification notices
//!
//! Commits enqueue a notice and return immediately. A single worker task
//! drains the queue in order and hands each notice to the configured sink.
//! A failed delivery is logged and dropped: there is no retry and no
//! feedback into the session, so local and remote state may diverge.

use crate::models::ClassificationNotice;
use crate::remote::ClassificationSink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<ClassificationNotice>,
}

impl NotificationDispatcher {
    /// Start the delivery worker. Must be called inside a Tokio runtime.
    ///
    /// The worker exits once every dispatcher handle is dropped and the
    /// queue is drained; await the returned handle to wait for that.
    pub fn spawn(sink: Arc<dyn ClassificationSink>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver(rx, sink));
        (Self { tx }, handle)
    }

    /// Queue a notice for delivery. Never blocks and never fails the caller.
    pub fn dispatch(&self, notice: ClassificationNotice) {
        if self.tx.send(notice).is_err() {
            warn!(
                transaction_id = notice.transaction_id,
                "Notification worker stopped; classification not sent"
            );
        }
    }
}

async fn deliver(
    mut rx: mpsc::UnboundedReceiver<ClassificationNotice>,
    sink: Arc<dyn ClassificationSink>,
) {
    while let Some(notice) = rx.recv().await {
        match sink.send(&notice).await {
            Ok(()) => debug!(
                transaction_id = notice.transaction_id,
                utility = notice.utility_value.as_str(),
                "Classification delivered"
            ),
            Err(e) => warn!(
                transaction_id = notice.transaction_id,
                utility = notice.utility_value.as_str(),
                "Classification delivery failed, not retried: {}",
                e
            ),
        }
    }
    debug!("Notification worker finished");
}
