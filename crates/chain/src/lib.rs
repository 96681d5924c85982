//! Retrieval-augmented chat chain for ragchat.
//!
//! A turn runs in two model calls with a retrieval step between them:
//!
//! ```text
//!   question ─▶ [rewrite] ─▶ standalone question ─▶ [retrieve + combine] ─▶ context
//!                                                                             │
//!   question ─────────────────────────────────────────────────────────▶ [answer] ─▶ answer
//! ```
//!
//! The answer stage sees the ORIGINAL question, not the rewritten one.
//! [`ChatController`] owns the history and lets one turn run at a time.

pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod templates;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{ChatController, ChatState, Reply};
pub use error::{ChainError, ControllerError};
pub use orchestrator::{ConversationOrchestrator, OrchestratorBuilder};
pub use pipeline::{ChainState, Pipeline, PromptStage, RetrievalStage, Stage};
