//! Conversation Layer
//!
//! Drives the tool-using chat protocol: the model's first completion
//! either answers directly or suggests tool calls, suggested calls wait
//! for an explicit user verdict, confirmed calls execute in order, and a
//! second completion turns their results into the final answer.
//!
//! Nothing here holds conversation state between requests; the full
//! history travels with every call, and each turn is an independent unit
//! of work.

pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use orchestrator::ChatOrchestrator;
pub use prompt::{SitePromptSource, SystemPromptSource};
pub use types::{
    ConfirmationPayload, TurnEvent, TurnOutcome, DECLINE_MESSAGE, NO_FOLLOW_UP_MESSAGE,
};
