//! # ragchat Core
//!
//! Domain types, traits, and error definitions for the ragchat
//! retrieval-augmented chat client. This crate has **no framework
//! dependencies**: it defines the seams that every other crate
//! implements against.
//!
//! ## Seams
//!
//! - [`Provider`]: sends a rendered prompt to a hosted model
//! - [`Retriever`]: maps a query to an ordered list of [`Document`]s
//! - [`DocumentCombiner`]: joins documents into one context string
//! - [`HistoryFormatter`]: renders conversation history for prompt interpolation
//!
//! Implementations live in their respective crates, and tests swap in
//! stubs freely.

pub mod document;
pub mod error;
pub mod history;
pub mod message;
pub mod prompt;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use document::{Document, DocumentCombiner, JoinCombiner, Retriever};
pub use error::{Error, ProviderError, PromptError, Result, RetrievalError};
pub use history::{ConversationHistory, HistoryEntry, HistoryFormatter, LabeledHistoryFormatter};
pub use message::{Message, Role};
pub use prompt::PromptTemplate;
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
