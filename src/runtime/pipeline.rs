//! One conversion attempt: download, convert, send back, clean up

use super::cleanup::TempFile;
use super::traits::Transport;
use crate::converter::{ConversionError, DocumentConverter};
use crate::session::ChatId;
use crate::state_machine::{messages, Direction, UploadedDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a conversion attempt did not deliver a document.
///
/// Payloads are rendered strings so the fault can travel inside events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionFault {
    #[error("download failed: {0}")]
    Download(String),
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("output file missing after conversion: {}", .0.display())]
    OutputMissing(PathBuf),
    #[error("conversion engine failed: {0}")]
    Engine(String),
    #[error("conversion timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("sending result failed: {0}")]
    Send(String),
    #[error("conversion cancelled")]
    Cancelled,
    #[error("conversion worker failed: {0}")]
    Worker(String),
}

impl ConversionFault {
    /// Generic reply for the user; internals are only logged
    pub fn user_message(&self) -> &'static str {
        match self {
            ConversionFault::InputNotFound(_) => messages::FILE_NOT_FOUND,
            _ => messages::PROCESSING_ERROR,
        }
    }
}

impl From<ConversionError> for ConversionFault {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::InputNotFound(path) => ConversionFault::InputNotFound(path),
            ConversionError::OutputMissing(path) => ConversionFault::OutputMissing(path),
            err @ ConversionError::ConversionFailed { .. } => {
                ConversionFault::Engine(err.to_string())
            }
        }
    }
}

/// Everything needed to run one attempt
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub id: Uuid,
    pub direction: Direction,
    pub file_id: String,
    /// Name the user uploaded the file under
    pub display_name: String,
    /// Where the upload is stored; unique per request
    pub source_path: PathBuf,
    /// Where the converter will write
    pub output_path: PathBuf,
}

impl ConversionRequest {
    pub fn new<C: DocumentConverter + ?Sized>(
        direction: Direction,
        document: &UploadedDocument,
        converter: &C,
    ) -> Self {
        let id = Uuid::new_v4();
        let source_path = converter
            .work_dir()
            .join(format!("{id}-{}", sanitize_file_name(&document.file_name)));
        let output_path = converter.output_path(direction, &source_path);
        Self {
            id,
            direction,
            file_id: document.file_id.clone(),
            display_name: document.file_name.clone(),
            source_path,
            output_path,
        }
    }

    /// Name of the document sent back: the upload's stem with the new extension.
    ///
    /// A bare extension such as `.docx` has no usable stem.
    pub fn reply_file_name(&self) -> String {
        let stem = Path::new(&self.display_name)
            .file_stem()
            .map(|s| s.to_string_lossy())
            .filter(|s| !s.is_empty() && !s.starts_with('.'))
            .unwrap_or_else(|| "converted".into());
        format!("{stem}.{}", self.direction.output_extension())
    }
}

/// Strip any directory components a client might put in a file name
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string())
}

/// Run one conversion attempt to completion.
///
/// Both temporary files are removed on every path out of this function. On
/// timeout or cancellation the blocking worker keeps the guards, so files it
/// writes late are removed when it finishes.
pub async fn run_conversion<T, C>(
    transport: &T,
    converter: Arc<C>,
    chat: ChatId,
    request: ConversionRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), ConversionFault>
where
    T: Transport + ?Sized,
    C: DocumentConverter + ?Sized + 'static,
{
    let started = Instant::now();
    let input_guard = TempFile::new(&request.source_path);
    let output_guard = TempFile::new(&request.output_path);

    transport
        .download(&request.file_id, &request.source_path)
        .await
        .map_err(|e| ConversionFault::Download(e.to_string()))?;
    tracing::debug!(
        request_id = %request.id,
        path = %request.source_path.display(),
        "Downloaded upload"
    );

    if let Err(e) = transport.send_text(chat, messages::CONVERTING, &[]).await {
        tracing::warn!(request_id = %request.id, error = %e, "Failed to send progress message");
    }

    let direction = request.direction;
    let source = request.source_path.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let result = converter.convert(direction, &source);
        (result, input_guard, output_guard)
    });

    let joined = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::info!(request_id = %request.id, "Conversion cancelled");
            return Err(ConversionFault::Cancelled);
        }
        joined = tokio::time::timeout(timeout, worker) => joined,
    };

    let (result, _input_guard, _output_guard) = match joined {
        Ok(Ok(finished)) => finished,
        Ok(Err(join_error)) => return Err(ConversionFault::Worker(join_error.to_string())),
        Err(_elapsed) => {
            tracing::warn!(
                request_id = %request.id,
                timeout_secs = timeout.as_secs(),
                "Conversion timed out"
            );
            return Err(ConversionFault::TimedOut(timeout));
        }
    };

    let produced = result?;
    // A converter may pick its own output location
    let _produced_guard = (produced != request.output_path).then(|| TempFile::new(&produced));

    transport
        .send_document(
            chat,
            &produced,
            &request.reply_file_name(),
            messages::result_caption(direction),
        )
        .await
        .map_err(|e| ConversionFault::Send(e.to_string()))?;

    tracing::info!(
        request_id = %request.id,
        %direction,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Converted document delivered"
    );
    Ok(())
}
