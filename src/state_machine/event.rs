//! Events that can occur in a chat

use crate::runtime::ConversionFault;
use crate::state_machine::state::Direction;

/// Slash commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

impl Command {
    /// Parse the command word of a message (`/start`, `/help@my_bot`).
    /// Returns `None` for anything that is not a known command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            _ => None,
        }
    }
}

/// A document the user sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Transport handle used to download the content
    pub file_id: String,
    /// Name as given by the user; empty when the client sent none
    pub file_name: String,
    pub file_size: Option<u64>,
}

impl UploadedDocument {
    pub fn new(file_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
            file_size: None,
        }
    }

    pub fn with_size(mut self, file_size: Option<u64>) -> Self {
        self.file_size = file_size;
        self
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Command(Command),
    SelectDirection {
        direction: Direction,
        /// Callback query to acknowledge, if the selection came from a button
        callback_id: Option<String>,
    },
    DocumentUpload(UploadedDocument),
    FreeText(String),

    // Pipeline events
    ConversionFinished {
        direction: Direction,
        outcome: Result<(), ConversionFault>,
    },
}

impl Event {
    /// Short description for the user action log
    pub fn describe(&self) -> String {
        match self {
            Event::Command(Command::Start) => "started the bot".to_string(),
            Event::Command(Command::Help) => "requested help".to_string(),
            Event::SelectDirection { direction, .. } => format!("selected {direction}"),
            Event::DocumentUpload(doc) => format!("uploaded {:?}", doc.file_name),
            Event::FreeText(text) => format!("sent message: {text}"),
            Event::ConversionFinished { direction, outcome } => match outcome {
                Ok(()) => format!("received {direction} result"),
                Err(_) => format!("{direction} conversion failed"),
            },
        }
    }
}
