//! Per-user chat state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the runtime feeds events in, `transition` decides the next state and the
//! effects to run, and the runtime performs the I/O.

mod effect;
pub mod event;
pub mod messages;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Button, Effect};
pub use event::{Command, Event, UploadedDocument};
pub use state::{ChatContext, ChatState, Direction};
pub use transition::{transition, Rejection, TransitionResult};
