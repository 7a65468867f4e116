//! Turn Guard, Action Engine, Turn Engine, and God Command Service
//! (–): the layer that turns untrusted AI-produced turn payloads
//! into sanitized, idempotent mutations of the shared snapshot.

#![warn(missing_docs)]

mod action_engine;
mod god_command;
mod turn_engine;
mod turn_guard;

pub use action_engine::{apply_actions, ActingAgent, ActionOutcome, ApplyActionsInput};
pub use god_command::{
    GodCommandOutcome, GodCommandRequest, GodCommandService, ReferenceGodCommandService,
};
pub use turn_engine::{apply_turn, record_incoming, ApplyTurnResult, ProfileCarrier};
pub use turn_guard::{sanitize, ActionType, MemoryScope, MemoryWrite, ProposedAction, SanitizedTurn, Tone};
