//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, maps updates to state machine events, and
//! implements the outbound `Transport` over plain HTTPS calls.

pub mod types;

use crate::converter::DocumentConverter;
use crate::runtime::{Inbound, SessionManager, SessionStore, Transport, TransportError};
use crate::session::{ChatId, UserId};
use crate::state_machine::{Button, Command, Direction, Event, UploadedDocument};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use types::{
    AnswerCallbackQuery, ApiResponse, GetFile, GetUpdates, InlineKeyboardButton,
    InlineKeyboardMarkup, SendMessage, Update,
};

/// Timeout for ordinary API calls and transfers
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Bot API client
pub struct TelegramClient {
    client: Client,
    /// `<base>/bot<token>`; never logged
    api_url: String,
    /// `<base>/file/bot<token>`; never logged
    file_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(
        base_url: &str,
        token: &str,
        poll_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base = base_url.trim_end_matches('/');
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(TransportError::http)?;

        Ok(Self {
            client,
            api_url: format!("{base}/bot{token}"),
            file_url: format!("{base}/file/bot{token}"),
            poll_timeout,
        })
    }

    async fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{method}", self.api_url))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(TransportError::http)?;

        // Error responses carry a JSON body too
        let body: ApiResponse<R> = response.json().await.map_err(TransportError::http)?;
        into_result(method, body)
    }

    /// Identity of the bot behind the token
    pub async fn get_me(&self) -> Result<types::User, TransportError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    /// One long-poll round
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        // Leave the server room to answer an empty poll
        let timeout = self.poll_timeout + Duration::from_secs(10);
        self.call("getUpdates", &params, timeout).await
    }
}

fn into_result<R>(method: &str, body: ApiResponse<R>) -> Result<R, TransportError> {
    if body.ok {
        return body
            .result
            .ok_or_else(|| TransportError::Api(format!("{method}: response without result")));
    }

    let mut message = format!(
        "{method} failed ({}): {}",
        body.error_code.unwrap_or_default(),
        body.description.as_deref().unwrap_or("no description")
    );
    if let Some(retry_after) = body.parameters.and_then(|p| p.retry_after) {
        message.push_str(&format!(", retry after {retry_after}s"));
    }
    Err(TransportError::Api(message))
}

fn keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup {
        inline_keyboard: buttons
            .iter()
            .map(|b| {
                vec![InlineKeyboardButton {
                    text: b.label.clone(),
                    callback_data: b.payload.clone(),
                }]
            })
            .collect(),
    })
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError> {
        let params = SendMessage {
            chat_id: chat.0,
            text,
            reply_markup: keyboard(buttons),
        };
        let _: serde_json::Value = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        let params = AnswerCallbackQuery {
            callback_query_id: callback_id,
        };
        let _: bool = self.call("answerCallbackQuery", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
        let file: types::File = self
            .call("getFile", &GetFile { file_id }, REQUEST_TIMEOUT)
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TransportError::Api(format!("no download path for file {file_id}")))?;

        let response = self
            .client
            .get(format!("{}/{file_path}", self.file_url))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(TransportError::http)?;

        let mut out = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(TransportError::http)?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::debug!(
            file_id,
            expected = file.file_size,
            bytes = written,
            path = %dest.display(),
            "Downloaded file"
        );
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("chat_id", chat.0.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(format!("{}/sendDocument", self.api_url))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(TransportError::http)?;
        let body: ApiResponse<serde_json::Value> =
            response.json().await.map_err(TransportError::http)?;
        into_result("sendDocument", body)?;
        Ok(())
    }
}

/// Map an update to an event, or `None` for updates the bot ignores
pub fn to_inbound(update: Update) -> Option<Inbound> {
    if let Some(query) = update.callback_query {
        let direction = query.data.as_deref().and_then(Direction::from_payload)?;
        let chat = query
            .message
            .as_ref()
            .map_or(query.from.id, |m| m.chat.id);
        return Some(Inbound {
            user: UserId(query.from.id),
            username: query.from.username,
            chat: ChatId(chat),
            event: Event::SelectDirection {
                direction,
                callback_id: Some(query.id),
            },
        });
    }

    let message = update.message?;
    let from = message.from?;

    let event = if let Some(document) = message.document {
        Event::DocumentUpload(
            UploadedDocument::new(document.file_id, document.file_name.unwrap_or_default())
                .with_size(document.file_size),
        )
    } else {
        let text = message.text?;
        match Command::parse(&text) {
            Some(command) => Event::Command(command),
            None => Event::FreeText(text),
        }
    };

    Some(Inbound {
        user: UserId(from.id),
        username: from.username,
        chat: ChatId(message.chat.id),
        event,
    })
}

/// Poll for updates and dispatch them until cancelled
pub async fn poll_updates<S, C>(
    client: Arc<TelegramClient>,
    manager: Arc<SessionManager<S, C, TelegramClient>>,
    cancel: CancellationToken,
) where
    S: SessionStore + 'static,
    C: DocumentConverter + 'static,
{
    let mut offset = 0_i64;
    let mut backoff = INITIAL_BACKOFF;
    tracing::info!(poll_timeout_secs = client.poll_timeout.as_secs(), "Polling for updates");

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = client.get_updates(offset) => result,
        };

        match result {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let update_id = update.update_id;
                    match to_inbound(update) {
                        Some(inbound) => {
                            if let Err(e) = manager.dispatch(inbound).await {
                                tracing::error!(update_id, error = %e, "Failed to dispatch update");
                            }
                        }
                        None => tracing::debug!(update_id, "Ignoring update"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, backoff_secs = backoff.as_secs(), "Polling failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }

    tracing::info!(active_runtimes = manager.active_runtimes().await, "Stopped polling");
}
