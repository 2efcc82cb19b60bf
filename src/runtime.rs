//! Runtime for executing dialogues
//!
//! The `Dispatcher` gives every active user an inbox and a worker task, so a
//! user's messages are handled strictly in arrival order while different
//! users proceed concurrently.

mod executor;
mod sessions;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogEngine;
pub use traits::*;

use crate::db::Database;
use crate::hotels::LoggingProvider;
use crate::messenger::TelegramMessenger;
use crate::state_machine::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Type alias for the production engine with concrete implementations
pub type ProductionEngine = DialogEngine<LoggingProvider, Database, TelegramMessenger>;

/// Routes inbound text to per-user workers
pub struct Dispatcher<P, H, M>
where
    P: HotelProvider + 'static,
    H: HistoryStore + 'static,
    M: Messenger + 'static,
{
    engine: Arc<DialogEngine<P, H, M>>,
    inboxes: Mutex<HashMap<UserId, mpsc::UnboundedSender<String>>>,
    idle_timeout: Duration,
}

impl<P, H, M> Dispatcher<P, H, M>
where
    P: HotelProvider + 'static,
    H: HistoryStore + 'static,
    M: Messenger + 'static,
{
    pub fn new(engine: Arc<DialogEngine<P, H, M>>, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            engine,
            inboxes: Mutex::new(HashMap::new()),
            idle_timeout,
        })
    }

    fn inboxes(&self) -> MutexGuard<'_, HashMap<UserId, mpsc::UnboundedSender<String>>> {
        self.inboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a message for the user's worker, starting one if needed
    pub fn dispatch(self: &Arc<Self>, user_id: UserId, text: String) {
        let mut inboxes = self.inboxes();

        let text = match inboxes.get(&user_id) {
            Some(inbox) => match inbox.send(text) {
                Ok(()) => return,
                Err(mpsc::error::SendError(text)) => text,
            },
            None => text,
        };

        let (inbox, rx) = mpsc::unbounded_channel();
        if inbox.send(text).is_err() {
            return;
        }
        inboxes.insert(user_id, inbox);
        drop(inboxes);

        tracing::debug!(user_id = %user_id, "Starting worker");
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.run_worker(user_id, rx).await;
        });
    }

    async fn run_worker(&self, user_id: UserId, mut rx: mpsc::UnboundedReceiver<String>) {
        loop {
            let text = match tokio::time::timeout(self.idle_timeout, rx.recv()).await {
                Ok(Some(text)) => text,
                Ok(None) => break,
                Err(_elapsed) => {
                    // Senders only send while holding the inbox map, so an empty
                    // queue seen under it stays empty once the entry is gone.
                    let mut inboxes = self.inboxes();
                    match rx.try_recv() {
                        Ok(text) => text,
                        Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                            inboxes.remove(&user_id);
                            rx.close();
                            break;
                        }
                    }
                }
            };
            self.engine.handle_text(user_id, text).await;
        }

        // Anything queued before close is still ours
        while let Ok(text) = rx.try_recv() {
            self.engine.handle_text(user_id, text).await;
        }
        tracing::debug!(user_id = %user_id, "Worker stopped");
    }

    /// Users with a live worker
    pub fn active_workers(&self) -> usize {
        self.inboxes().len()
    }
}
