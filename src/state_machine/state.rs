//! Chat state types

use crate::session::{ChatId, UserId};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Conversion Direction
// ============================================================================

/// Which of the two supported conversions a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    WordToPdf,
    PdfToWord,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::WordToPdf, Direction::PdfToWord];

    /// Callback payload carried by the inline button for this direction
    pub fn as_payload(self) -> &'static str {
        match self {
            Direction::WordToPdf => "word_to_pdf",
            Direction::PdfToWord => "pdf_to_word",
        }
    }

    /// Parse a button payload. Unknown payloads are not a direction.
    pub fn from_payload(payload: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_payload() == payload)
    }

    /// Button label shown in the start menu
    pub fn label(self) -> &'static str {
        match self {
            Direction::WordToPdf => "Word to PDF",
            Direction::PdfToWord => "PDF to Word",
        }
    }

    /// File extensions (lowercase, with dot) accepted as input
    pub fn input_extensions(self) -> &'static [&'static str] {
        match self {
            Direction::WordToPdf => &[".doc", ".docx"],
            Direction::PdfToWord => &[".pdf"],
        }
    }

    /// Extension (without dot) of the produced file
    pub fn output_extension(self) -> &'static str {
        match self {
            Direction::WordToPdf => "pdf",
            Direction::PdfToWord => "docx",
        }
    }

    /// Whether an uploaded file name is a valid input for this direction.
    /// The check is a case-insensitive suffix match on the name.
    pub fn accepts(self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.input_extensions()
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_payload())
    }
}

// ============================================================================
// Chat State
// ============================================================================

/// Chat state, a view over the user's pending direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    /// No conversion selected
    #[default]
    Idle,

    /// Word to PDF selected, waiting for a .doc/.docx upload
    AwaitingWordFile,

    /// PDF to Word selected, waiting for a .pdf upload
    AwaitingPdfFile,
}

impl ChatState {
    /// State after selecting `direction`
    pub fn awaiting(direction: Direction) -> Self {
        match direction {
            Direction::WordToPdf => ChatState::AwaitingWordFile,
            Direction::PdfToWord => ChatState::AwaitingPdfFile,
        }
    }

    /// The direction this state is waiting to fulfil
    pub fn pending_direction(self) -> Option<Direction> {
        match self {
            ChatState::Idle => None,
            ChatState::AwaitingWordFile => Some(Direction::WordToPdf),
            ChatState::AwaitingPdfFile => Some(Direction::PdfToWord),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AwaitingWordFile => "awaiting_word_file",
            ChatState::AwaitingPdfFile => "awaiting_pdf_file",
        }
    }
}

impl From<Option<Direction>> for ChatState {
    fn from(pending: Option<Direction>) -> Self {
        pending.map_or(ChatState::Idle, ChatState::awaiting)
    }
}

// ============================================================================
// Chat Context
// ============================================================================

/// Per-user context the runtime carries alongside the state
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub user_id: UserId,
    /// Display name for logs only
    pub username: Option<String>,
    /// Chat the latest event came from; replies go here
    pub chat_id: ChatId,
    /// Upper bound on a single conversion
    pub conversion_timeout: Duration,
}

/// Default bound on a single conversion
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);

impl ChatContext {
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            username: None,
            chat_id,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }
}
