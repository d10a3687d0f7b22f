//! Best-effort persistence of chat exchanges.
//!
//! Handlers only enqueue a [`PersistTask`]; the background task owns every
//! store write. Failures never reach the HTTP response, they are logged and
//! counted in [`PersistenceStats`] so they stay observable.

use crate::infrastructure::entities::{Message, MessageKind};
use crate::infrastructure::traits::{ConversationRepository, StoreError};
use chrono::Utc;
use di::Ref;
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

pub const PERSIST_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct PersistTask {
    pub conversation_id: Uuid,
    pub user_message: Option<String>,
    pub assistant_message: String,
}

#[derive(Debug, Default)]
pub struct PersistenceStats {
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistenceSnapshot {
    /// Exchanges accepted by the queue.
    pub enqueued: u64,
    /// Records written to the store.
    pub written: u64,
    /// Records the store rejected.
    pub failed: u64,
    /// Records lost before reaching the store: queue full or closed.
    pub dropped: u64,
    /// Records not stored because no store is configured.
    pub skipped: u64,
}

impl PersistenceStats {
    pub fn snapshot(&self) -> PersistenceSnapshot {
        PersistenceSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

pub struct PersistQueue {
    sender: mpsc::Sender<PersistTask>,
    stats: Arc<PersistenceStats>,
}

impl PersistQueue {
    pub fn new(capacity: usize) -> (PersistQueue, mpsc::Receiver<PersistTask>) {
        let (sender, receiver) = mpsc::channel(capacity);

        (
            PersistQueue {
                sender,
                stats: Arc::new(PersistenceStats::default()),
            },
            receiver,
        )
    }

    /// Hands the exchange to the background task without waiting.
    pub fn submit(&self, task: PersistTask) {
        let records = task.record_count();

        match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(task)) => {
                warn!(
                    "persistence queue full, dropping exchange for conversation {}",
                    task.conversation_id
                );
                self.stats.dropped.fetch_add(records, Ordering::Relaxed);
            }
            Err(TrySendError::Closed(task)) => {
                error!(
                    "persistence task is not running, dropping exchange for conversation {}",
                    task.conversation_id
                );
                self.stats.dropped.fetch_add(records, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> Arc<PersistenceStats> {
        self.stats.clone()
    }
}

impl PersistTask {
    fn record_count(&self) -> u64 {
        if self.user_message.is_some() { 2 } else { 1 }
    }

    fn into_messages(self) -> Vec<Message> {
        let conversation_id = self.conversation_id;
        let record = |kind, text| Message {
            id: Uuid::new_v4(),
            conversation_id,
            kind,
            created_at: Utc::now(),
            text,
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(user_message) = self.user_message {
            messages.push(record(MessageKind::User, user_message));
        }
        messages.push(record(MessageKind::Assistant, self.assistant_message));
        messages
    }
}

/// Writes queued exchanges until every [`PersistQueue`] sender is gone.
pub async fn background_task(
    mut task_queue: mpsc::Receiver<PersistTask>,
    repository: Ref<dyn ConversationRepository>,
    stats: Arc<PersistenceStats>,
) {
    while let Some(task) = task_queue.recv().await {
        let conversation_id = task.conversation_id;

        // The user turn is written before the reply so creation order matches turn order.
        for message in task.into_messages() {
            let kind = message.kind;
            match repository.create_message_in_conversation(message).await {
                Ok(_) => {
                    stats.written.fetch_add(1, Ordering::Relaxed);
                    debug!("stored {kind:?} message in conversation {conversation_id}");
                }
                Err(StoreError::NotConfigured) => {
                    stats.skipped.fetch_add(1, Ordering::Relaxed);
                    warn!("no database configured, {kind:?} message for conversation {conversation_id} not stored");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!("failed to store {kind:?} message in conversation {conversation_id}: {e}");
                }
            }
        }
    }

    debug!("persistence queue closed");
}
