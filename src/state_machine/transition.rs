//! Pure state transition function

use super::messages;
use super::{Button, ChatContext, ChatState, Command, Direction, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Expected, user-caused refusals. These never reach the converter and
/// leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{file_name:?} is not a valid input for {direction}")]
    ValidationRejected {
        direction: Direction,
        file_name: String,
    },
    #[error("document uploaded with no conversion selected")]
    NoPendingDirection,
}

impl Rejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            Rejection::ValidationRejected { direction, .. } => messages::invalid_file(*direction),
            Rejection::NoPendingDirection => messages::NO_PENDING_DIRECTION,
        }
    }
}

fn start_menu() -> Vec<Button> {
    Direction::ALL.into_iter().map(Button::for_direction).collect()
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(
    state: &ChatState,
    _context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, Rejection> {
    match (*state, event) {
        // ============================================================
        // Informational replies, state unchanged
        // ============================================================
        (current, Event::Command(Command::Start)) => Ok(TransitionResult::new(current)
            .with_effect(Effect::reply_with_buttons(messages::WELCOME, start_menu()))),

        (current, Event::Command(Command::Help)) => {
            Ok(TransitionResult::new(current).with_effect(Effect::reply(messages::HELP)))
        }

        (current, Event::FreeText(_)) => {
            Ok(TransitionResult::new(current).with_effect(Effect::reply(messages::NUDGE)))
        }

        // ============================================================
        // Direction selection overwrites any prior selection
        // ============================================================
        (_, Event::SelectDirection {
            direction,
            callback_id,
        }) => {
            let mut result = TransitionResult::new(ChatState::awaiting(direction));
            if let Some(callback_id) = callback_id {
                result = result.with_effect(Effect::AcknowledgeSelection { callback_id });
            }
            Ok(result
                .with_effect(Effect::PersistState)
                .with_effect(Effect::reply(messages::upload_prompt(direction))))
        }

        // ============================================================
        // Uploads
        // ============================================================
        (ChatState::Idle, Event::DocumentUpload(_)) => Err(Rejection::NoPendingDirection),

        (
            current @ (ChatState::AwaitingWordFile | ChatState::AwaitingPdfFile),
            Event::DocumentUpload(document),
        ) => {
            let direction = current
                .pending_direction()
                .ok_or(Rejection::NoPendingDirection)?;
            if !direction.accepts(&document.file_name) {
                return Err(Rejection::ValidationRejected {
                    direction,
                    file_name: document.file_name,
                });
            }
            // State stays put until the attempt finishes
            Ok(TransitionResult::new(current)
                .with_effect(Effect::RunConversion { direction, document }))
        }

        // ============================================================
        // Conversion finished: always back to Idle
        // ============================================================
        (_, Event::ConversionFinished { outcome, .. }) => {
            let result = TransitionResult::new(ChatState::Idle).with_effect(Effect::PersistState);
            match outcome {
                Ok(()) => Ok(result),
                Err(fault) => Ok(result.with_effect(Effect::reply(fault.user_message()))),
            }
        }
    }
}
