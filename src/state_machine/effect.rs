//! Effects produced by state transitions

use crate::state_machine::event::UploadedDocument;
use crate::state_machine::state::Direction;

/// Inline button attached to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn for_direction(direction: Direction) -> Self {
        Self {
            label: direction.label().to_string(),
            payload: direction.as_payload().to_string(),
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a text message, optionally with inline buttons
    Reply { text: String, buttons: Vec<Button> },

    /// Acknowledge a button press so the client stops its spinner
    AcknowledgeSelection { callback_id: String },

    /// Write the new state to the session store
    PersistState,

    /// Download, convert, send back and clean up (runs the pipeline)
    RunConversion {
        direction: Direction,
        document: UploadedDocument,
    },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            buttons: vec![],
        }
    }

    pub fn reply_with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Effect::Reply {
            text: text.into(),
            buttons,
        }
    }
}
