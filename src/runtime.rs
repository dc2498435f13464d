//! Runtime for executing per-user chat sessions
//!
//! One runtime task per user, fed over an mpsc channel: a user's events are
//! handled strictly in order while different users proceed concurrently.

mod cleanup;
mod executor;
mod pipeline;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use pipeline::ConversionFault;
pub use traits::*;

use crate::converter::{DocumentConverter, FileConverter};
use crate::session::{ChatId, InMemorySessionStore, UserId};
use crate::state_machine::state::DEFAULT_CONVERSION_TIMEOUT;
use crate::state_machine::{ChatContext, Event};
use crate::telegram::TelegramClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Type alias for the production manager with concrete implementations
pub type ProductionManager = SessionManager<InMemorySessionStore, FileConverter, TelegramClient>;

/// An event together with who sent it and where to reply
#[derive(Debug, Clone)]
pub struct Inbound {
    pub user: UserId,
    pub username: Option<String>,
    pub chat: ChatId,
    pub event: Event,
}

/// Knobs shared by every runtime
#[derive(Debug, Clone, Copy)]
pub struct RuntimeSettings {
    pub conversion_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// Handle to interact with a running chat runtime
#[derive(Clone)]
pub struct ChatHandle {
    pub event_tx: mpsc::Sender<Inbound>,
}

/// Manager for all chat runtimes
pub struct SessionManager<S, C, T>
where
    S: SessionStore + 'static,
    C: DocumentConverter + 'static,
    T: Transport + 'static,
{
    store: Arc<S>,
    converter: Arc<C>,
    transport: Arc<T>,
    settings: RuntimeSettings,
    runtimes: RwLock<HashMap<UserId, ChatHandle>>,
    cancel: CancellationToken,
}

impl<S, C, T> SessionManager<S, C, T>
where
    S: SessionStore + 'static,
    C: DocumentConverter + 'static,
    T: Transport + 'static,
{
    pub fn new(
        store: Arc<S>,
        converter: Arc<C>,
        transport: Arc<T>,
        settings: RuntimeSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            converter,
            transport,
            settings,
            runtimes: RwLock::new(HashMap::new()),
            cancel,
        }
    }

    /// Get or create the runtime for a user
    pub async fn get_or_create(&self, user: UserId, chat: ChatId) -> ChatHandle {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(&user) {
                if !handle.event_tx.is_closed() {
                    return handle.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another dispatch may have started it meanwhile
        if let Some(handle) = runtimes.get(&user) {
            if !handle.event_tx.is_closed() {
                return handle.clone();
            }
        }

        let (event_tx, event_rx) = mpsc::channel(32);
        let context = ChatContext::new(user, chat).with_timeout(self.settings.conversion_timeout);
        let runtime = ChatRuntime::new(
            context,
            Arc::clone(&self.store),
            Arc::clone(&self.converter),
            Arc::clone(&self.transport),
            event_rx,
            self.cancel.child_token(),
        );

        tokio::spawn(async move {
            runtime.run().await;
            tracing::debug!(user_id = %user, "Chat runtime finished");
        });

        let handle = ChatHandle { event_tx };
        runtimes.insert(user, handle.clone());
        tracing::debug!(user_id = %user, active = runtimes.len(), "Started chat runtime");
        handle
    }

    /// Route an inbound event to its user's runtime
    pub async fn dispatch(&self, inbound: Inbound) -> Result<(), String> {
        let user = inbound.user;
        let handle = self.get_or_create(user, inbound.chat).await;
        match handle.event_tx.send(inbound).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(inbound)) => {
                // Runtime went away between lookup and send; start a fresh one once
                self.runtimes.write().await.remove(&user);
                let handle = self.get_or_create(user, inbound.chat).await;
                handle
                    .event_tx
                    .send(inbound)
                    .await
                    .map_err(|e| format!("Failed to dispatch event for user {user}: {e}"))
            }
        }
    }

    /// Number of users with a live runtime
    pub async fn active_runtimes(&self) -> usize {
        self.runtimes
            .read()
            .await
            .values()
            .filter(|h| !h.event_tx.is_closed())
            .count()
    }
}
