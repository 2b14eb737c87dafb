//! Model adapters used by the moderation gate and the secured agent.
//!
//! Providers implement the trait-based interface defined in [`traits`]; the
//! [`chat_completions`] module speaks the OpenAI-compatible wire shape served by
//! vLLM, LiteLLM and most hosted gateways.

#![warn(missing_docs, clippy::pedantic)]

pub mod chat_completions;
pub mod traits;

mod http_client;
