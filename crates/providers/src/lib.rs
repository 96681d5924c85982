//! LLM Provider implementations for ragchat.
//!
//! All providers implement the `ragchat_core::Provider` trait.
//! [`router::default_from_config`] builds the configured default provider.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::default_from_config;
