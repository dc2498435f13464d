//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::runtime::ConversionFault;
use crate::session::{ChatId, UserId};
use proptest::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ChatContext {
    ChatContext::new(UserId(42), ChatId(42))
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::WordToPdf), Just(Direction::PdfToWord)]
}

fn arb_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::Idle),
        Just(ChatState::AwaitingWordFile),
        Just(ChatState::AwaitingPdfFile),
    ]
}

fn arb_awaiting_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::AwaitingWordFile),
        Just(ChatState::AwaitingPdfFile),
    ]
}

fn arb_extension() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(".doc"),
        Just(".docx"),
        Just(".DOCX"),
        Just(".pdf"),
        Just(".Pdf"),
        Just(".txt"),
        Just(".odt"),
        Just(""),
    ]
}

fn arb_file_name() -> impl Strategy<Value = String> {
    ("[a-zA-Z0-9 _-]{1,16}", arb_extension()).prop_map(|(stem, ext)| format!("{stem}{ext}"))
}

fn arb_fault() -> impl Strategy<Value = ConversionFault> {
    prop_oneof![
        Just(ConversionFault::InputNotFound(PathBuf::from("temp/in"))),
        Just(ConversionFault::OutputMissing(PathBuf::from("temp/out"))),
        "[a-z ]{1,20}".prop_map(ConversionFault::Engine),
        "[a-z ]{1,20}".prop_map(ConversionFault::Download),
        "[a-z ]{1,20}".prop_map(ConversionFault::Send),
        Just(ConversionFault::TimedOut(Duration::from_secs(1))),
        Just(ConversionFault::Cancelled),
    ]
}

fn arb_informational_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Command(Command::Start)),
        Just(Event::Command(Command::Help)),
        "[a-zA-Z0-9 ]{0,40}".prop_map(Event::FreeText),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Selecting a direction always lands in the matching awaiting state
    #[test]
    fn prop_selection_overwrites(state in arb_state(), direction in arb_direction()) {
        let result = transition(&state, &test_context(), Event::SelectDirection {
            direction,
            callback_id: None,
        }).unwrap();
        prop_assert_eq!(result.new_state.pending_direction(), Some(direction));
        prop_assert!(result.effects.contains(&Effect::PersistState));
    }

    /// /start, /help and free text never change the state
    #[test]
    fn prop_informational_events_keep_state(
        state in arb_state(),
        event in arb_informational_event(),
    ) {
        let result = transition(&state, &test_context(), event).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert!(!result.effects.contains(&Effect::PersistState));
        prop_assert_eq!(result.effects.len(), 1);
    }

    /// An upload either starts a conversion for the pending direction or is
    /// rejected; it never changes the state
    #[test]
    fn prop_upload_converts_only_matching_files(
        state in arb_awaiting_state(),
        name in arb_file_name(),
    ) {
        let direction = state.pending_direction().unwrap();
        let event = Event::DocumentUpload(UploadedDocument::new("f", name.clone()));
        match transition(&state, &test_context(), event) {
            Ok(result) => {
                prop_assert!(direction.accepts(&name));
                prop_assert_eq!(result.new_state, state);
                let converts_pending = matches!(
                    result.effects.as_slice(),
                    [Effect::RunConversion { direction: d, .. }] if *d == direction
                );
                prop_assert!(converts_pending);
            }
            Err(rejection) => {
                prop_assert!(!direction.accepts(&name));
                prop_assert_eq!(
                    rejection,
                    Rejection::ValidationRejected { direction, file_name: name }
                );
            }
        }
    }

    /// Uploading with nothing selected is always the same rejection
    #[test]
    fn prop_idle_upload_rejected(name in arb_file_name()) {
        let event = Event::DocumentUpload(UploadedDocument::new("f", name));
        let err = transition(&ChatState::Idle, &test_context(), event).unwrap_err();
        prop_assert_eq!(err, Rejection::NoPendingDirection);
    }

    /// Every finished attempt resets to Idle; failures reply exactly once
    #[test]
    fn prop_finished_conversion_resets(
        state in arb_state(),
        direction in arb_direction(),
        outcome in proptest::option::of(arb_fault()),
    ) {
        let failed = outcome.is_some();
        let outcome = outcome.map_or(Ok(()), Err);
        let event = Event::ConversionFinished { direction, outcome };
        let result = transition(&state, &test_context(), event).unwrap();
        prop_assert_eq!(result.new_state, ChatState::Idle);
        let replies = result.effects.iter().filter(|e| matches!(e, Effect::Reply { .. })).count();
        prop_assert_eq!(replies, usize::from(failed));
    }

    /// Replies to faults never leak internal detail
    #[test]
    fn prop_fault_messages_are_generic(fault in arb_fault()) {
        let message = fault.user_message();
        prop_assert!(message == messages::FILE_NOT_FOUND || message == messages::PROCESSING_ERROR);
    }
}
