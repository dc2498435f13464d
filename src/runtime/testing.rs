//! Mock implementations for testing
//!
//! These mocks enable executor and pipeline tests without network access.

use super::traits::{SessionStore, Transport, TransportError};
use super::{ChatRuntime, Inbound};
use crate::converter::{docx, ConversionEngine, EngineError, FileConverter};
use crate::session::{ChatId, InMemorySessionStore, UserId};
use crate::state_machine::{Button, ChatContext, Direction, Event};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SentText {
    pub chat: ChatId,
    pub text: String,
    pub buttons: Vec<Button>,
}

/// A document as it looked when the transport was asked to send it
#[derive(Debug, Clone)]
pub struct SentDocument {
    pub chat: ChatId,
    pub file_name: String,
    pub caption: String,
    pub bytes: Vec<u8>,
}

/// Transport that records everything and serves a fixed payload for downloads
pub struct MockTransport {
    payload: Vec<u8>,
    fail_download: bool,
    fail_send_document: bool,
    texts: Mutex<Vec<SentText>>,
    acks: Mutex<Vec<String>>,
    downloads: Mutex<Vec<(String, PathBuf)>>,
    documents: Mutex<Vec<SentDocument>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            payload: b"uploaded bytes".to_vec(),
            fail_download: false,
            fail_send_document: false,
            texts: Mutex::new(Vec::new()),
            acks: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            documents: Mutex::new(Vec::new()),
        }
    }

    /// Bytes written for every download
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn failing_download(mut self) -> Self {
        self.fail_download = true;
        self
    }

    pub fn failing_send_document(mut self) -> Self {
        self.fail_send_document = true;
        self
    }

    pub fn texts(&self) -> Vec<SentText> {
        self.texts.lock().unwrap().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().unwrap().last().map(|t| t.text.clone())
    }

    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn documents(&self) -> Vec<SentDocument> {
        self.documents.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), TransportError> {
        self.texts.lock().unwrap().push(SentText {
            chat,
            text: text.to_string(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        self.acks.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
        self.downloads
            .lock()
            .unwrap()
            .push((file_id.to_string(), dest.to_path_buf()));
        if self.fail_download {
            return Err(TransportError::Api("file is too big".to_string()));
        }
        tokio::fs::write(dest, &self.payload).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        if self.fail_send_document {
            return Err(TransportError::Api("Bad Request: chat not found".to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        self.documents.lock().unwrap().push(SentDocument {
            chat,
            file_name: file_name.to_string(),
            caption: caption.to_string(),
            bytes,
        });
        Ok(())
    }
}

// ============================================================================
// Stub Engines
// ============================================================================

/// Writes fixed bytes to the output
#[derive(Debug, Clone)]
pub struct WriteEngine {
    pub bytes: Vec<u8>,
}

impl Default for WriteEngine {
    fn default() -> Self {
        Self {
            bytes: b"converted bytes".to_vec(),
        }
    }
}

impl ConversionEngine for WriteEngine {
    fn word_to_pdf(&self, _input: &Path, output: &Path) -> Result<(), EngineError> {
        std::fs::write(output, &self.bytes)?;
        Ok(())
    }

    fn pdf_to_word(&self, _input: &Path, output: &Path) -> Result<(), EngineError> {
        std::fs::write(output, &self.bytes)?;
        Ok(())
    }
}

/// Reports success without producing anything
#[derive(Debug, Clone, Copy)]
pub struct SilentEngine;

impl ConversionEngine for SilentEngine {
    fn word_to_pdf(&self, _input: &Path, _output: &Path) -> Result<(), EngineError> {
        Ok(())
    }

    fn pdf_to_word(&self, _input: &Path, _output: &Path) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingEngine;

impl ConversionEngine for FailingEngine {
    fn word_to_pdf(&self, _input: &Path, _output: &Path) -> Result<(), EngineError> {
        Err(EngineError::Malformed("corrupt package".to_string()))
    }

    fn pdf_to_word(&self, _input: &Path, _output: &Path) -> Result<(), EngineError> {
        Err(EngineError::Malformed("corrupt xref table".to_string()))
    }
}

/// Blocks for a while, then writes its output
#[derive(Debug, Clone, Copy)]
pub struct SlowEngine {
    delay: Duration,
}

impl SlowEngine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ConversionEngine for SlowEngine {
    fn word_to_pdf(&self, _input: &Path, output: &Path) -> Result<(), EngineError> {
        std::thread::sleep(self.delay);
        std::fs::write(output, b"late pdf")?;
        Ok(())
    }

    fn pdf_to_word(&self, _input: &Path, output: &Path) -> Result<(), EngineError> {
        std::thread::sleep(self.delay);
        std::fs::write(output, b"late docx")?;
        Ok(())
    }
}

/// Counts calls before delegating
pub struct CountingEngine<E> {
    inner: E,
    calls: Arc<AtomicUsize>,
}

impl<E: ConversionEngine> ConversionEngine for CountingEngine<E> {
    fn word_to_pdf(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.word_to_pdf(input, output)
    }

    fn pdf_to_word(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.pdf_to_word(input, output)
    }
}

/// Bytes of a `.docx` holding `paragraphs`
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.docx");
    let owned: Vec<String> = paragraphs.iter().map(|p| (*p).to_string()).collect();
    docx::write_document(&path, &owned).unwrap();
    std::fs::read(&path).unwrap()
}

// ============================================================================
// Test Harness
// ============================================================================

type TestRuntime<E> =
    ChatRuntime<InMemorySessionStore, FileConverter<CountingEngine<E>>, MockTransport>;

/// One user's runtime wired to mocks, driven event by event
pub struct TestChat<E: ConversionEngine + 'static> {
    pub store: Arc<InMemorySessionStore>,
    pub transport: Arc<MockTransport>,
    pub work_dir: TempDir,
    pub cancel: CancellationToken,
    pub user: UserId,
    pub chat: ChatId,
    calls: Arc<AtomicUsize>,
    runtime: TestRuntime<E>,
    _event_tx: mpsc::Sender<Inbound>,
}

impl<E: ConversionEngine + 'static> TestChat<E> {
    pub fn new(engine: E) -> Self {
        Self::with_transport(engine, MockTransport::new())
    }

    pub fn with_transport(engine: E, transport: MockTransport) -> Self {
        let work_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = CountingEngine {
            inner: engine,
            calls: Arc::clone(&calls),
        };
        let converter = Arc::new(FileConverter::with_engine(work_dir.path(), engine).unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let transport = Arc::new(transport);
        let cancel = CancellationToken::new();
        let user = UserId(7);
        let chat = ChatId(42);
        let (event_tx, event_rx) = mpsc::channel(8);

        let runtime = ChatRuntime::new(
            ChatContext::new(user, chat),
            Arc::clone(&store),
            converter,
            Arc::clone(&transport),
            event_rx,
            cancel.clone(),
        );

        Self {
            store,
            transport,
            work_dir,
            cancel,
            user,
            chat,
            calls,
            runtime,
            _event_tx: event_tx,
        }
    }

    /// Use a different conversion deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runtime.set_conversion_timeout(timeout);
        self
    }

    /// Process one event to completion, including any conversion it starts
    pub async fn send(&mut self, event: Event) {
        self.runtime
            .handle_inbound(Inbound {
                user: self.user,
                username: Some("tester".to_string()),
                chat: self.chat,
                event,
            })
            .await;
    }

    pub async fn pending(&self) -> Option<Direction> {
        self.store.get(self.user).await
    }

    pub fn converter_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn work_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_dir.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_and_serves_payload() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("in.pdf");
        let transport = MockTransport::new().with_payload(b"%PDF-1.5".to_vec());

        transport.download("file-9", &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5");
        assert_eq!(transport.downloads(), vec![("file-9".to_string(), dest.clone())]);

        transport
            .send_document(ChatId(1), &dest, "out.pdf", "caption")
            .await
            .unwrap();
        let documents = transport.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].bytes, b"%PDF-1.5");
    }

    #[tokio::test]
    async fn test_failing_download_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("in.pdf");
        let transport = MockTransport::new().failing_download();

        assert!(transport.download("file-9", &dest).await.is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_docx_fixture_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.docx");
        std::fs::write(&path, docx_bytes(&["one", "two"])).unwrap();
        assert_eq!(docx::read_paragraphs(&path).unwrap(), vec!["one", "two"]);
    }
}
