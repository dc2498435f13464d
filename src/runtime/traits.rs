//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::session::{ChatId, UserId};
use crate::state_machine::{Button, Direction};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Storage for the per-user pending direction
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Pending direction for a user; `None` means nothing selected
    async fn get(&self, user: UserId) -> Option<Direction>;

    /// Record a selection, overwriting any previous one
    async fn set(&self, user: UserId, direction: Direction);

    /// Forget the selection
    async fn clear(&self, user: UserId);
}

/// Errors talking to the messaging platform
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Wrap a reqwest error with the request URL stripped; the URL carries
    /// the bot token
    pub fn http(err: reqwest::Error) -> Self {
        TransportError::Http(err.without_url())
    }
}

/// Outbound side of the messaging platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message, with an inline keyboard when `buttons` is non-empty
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError>;

    /// Answer a button press
    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError>;

    /// Download a user-sent file to `dest`
    async fn download(&self, file_id: &str, dest: &Path) -> Result<(), TransportError>;

    /// Upload a file as a document under `file_name`
    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), TransportError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, user: UserId) -> Option<Direction> {
        (**self).get(user).await
    }

    async fn set(&self, user: UserId, direction: Direction) {
        (**self).set(user, direction).await;
    }

    async fn clear(&self, user: UserId) {
        (**self).clear(user).await;
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError> {
        (**self).send_text(chat, text, buttons).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        (**self).acknowledge(callback_id).await
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
        (**self).download(file_id, dest).await
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        (**self).send_document(chat, path, file_name, caption).await
    }
}
