//! Per-user chat runtime executor

use super::pipeline::{run_conversion, ConversionRequest};
use super::traits::{SessionStore, Transport};
use super::Inbound;
use crate::converter::DocumentConverter;
use crate::state_machine::{transition, ChatContext, ChatState, Effect, Event};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runtime that serializes one user's events through the state machine
pub struct ChatRuntime<S, C, T>
where
    S: SessionStore + 'static,
    C: DocumentConverter + 'static,
    T: Transport + 'static,
{
    context: ChatContext,
    store: Arc<S>,
    converter: Arc<C>,
    transport: Arc<T>,
    event_rx: mpsc::Receiver<Inbound>,
    cancel: CancellationToken,
}

impl<S, C, T> ChatRuntime<S, C, T>
where
    S: SessionStore + 'static,
    C: DocumentConverter + 'static,
    T: Transport + 'static,
{
    pub fn new(
        context: ChatContext,
        store: Arc<S>,
        converter: Arc<C>,
        transport: Arc<T>,
        event_rx: mpsc::Receiver<Inbound>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            context,
            store,
            converter,
            transport,
            event_rx,
            cancel,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_conversion_timeout(&mut self, timeout: std::time::Duration) {
        self.context.conversion_timeout = timeout;
    }

    pub async fn run(mut self) {
        tracing::debug!(user_id = %self.context.user_id, "Starting chat runtime");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                inbound = self.event_rx.recv() => match inbound {
                    Some(inbound) => self.handle_inbound(inbound).await,
                    None => break,
                },
            }
        }

        tracing::debug!(user_id = %self.context.user_id, "Chat runtime stopped");
    }

    /// Take one inbound event through transition and effects
    pub async fn handle_inbound(&mut self, inbound: Inbound) {
        if inbound.username.is_some() {
            self.context.username = inbound.username;
        }
        self.context.chat_id = inbound.chat;

        tracing::info!(
            user_id = %self.context.user_id,
            username = self.context.username.as_deref().unwrap_or("unknown"),
            action = %inbound.event.describe(),
            "User performed action"
        );

        self.process_event(inbound.event).await;
    }

    async fn process_event(&mut self, event: Event) {
        // Effects can feed events back in (a finished conversion)
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let state = ChatState::from(self.store.get(self.context.user_id).await);

            let result = match transition(&state, &self.context, current_event) {
                Ok(r) => r,
                Err(rejection) => {
                    tracing::warn!(
                        user_id = %self.context.user_id,
                        state = state.name(),
                        %rejection,
                        "Request rejected"
                    );
                    self.reply(rejection.user_message(), &[]).await;
                    continue;
                }
            };

            if result.new_state != state {
                tracing::debug!(
                    user_id = %self.context.user_id,
                    from = state.name(),
                    to = result.new_state.name(),
                    "State change"
                );
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(result.new_state, effect).await {
                    events_to_process.push(generated);
                }
            }
        }
    }

    async fn execute_effect(&mut self, new_state: ChatState, effect: Effect) -> Option<Event> {
        match effect {
            Effect::PersistState => {
                match new_state.pending_direction() {
                    Some(direction) => self.store.set(self.context.user_id, direction).await,
                    None => self.store.clear(self.context.user_id).await,
                }
                None
            }

            Effect::Reply { text, buttons } => {
                self.reply(&text, &buttons).await;
                None
            }

            Effect::AcknowledgeSelection { callback_id } => {
                if let Err(e) = self.transport.acknowledge(&callback_id).await {
                    tracing::warn!(
                        user_id = %self.context.user_id,
                        error = %e,
                        "Failed to answer callback query"
                    );
                }
                None
            }

            Effect::RunConversion {
                direction,
                document,
            } => {
                let request = ConversionRequest::new(direction, &document, self.converter.as_ref());
                tracing::info!(
                    user_id = %self.context.user_id,
                    request_id = %request.id,
                    %direction,
                    file_name = %document.file_name,
                    file_size = document.file_size,
                    "Starting conversion request"
                );

                let outcome = run_conversion(
                    self.transport.as_ref(),
                    Arc::clone(&self.converter),
                    self.context.chat_id,
                    request,
                    self.context.conversion_timeout,
                    &self.cancel,
                )
                .await;

                if let Err(fault) = &outcome {
                    tracing::error!(
                        user_id = %self.context.user_id,
                        %direction,
                        error = %fault,
                        "Conversion failed"
                    );
                }

                Some(Event::ConversionFinished { direction, outcome })
            }
        }
    }

    async fn reply(&self, text: &str, buttons: &[crate::state_machine::Button]) {
        if let Err(e) = self
            .transport
            .send_text(self.context.chat_id, text, buttons)
            .await
        {
            tracing::error!(user_id = %self.context.user_id, error = %e, "Failed to send reply");
        }
    }
}
