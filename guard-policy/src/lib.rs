//! Content-safety moderation for agent conversations.
//!
//! The [`ModerationGate`] renders a conversation into a Llama Guard style
//! instruction, asks a classifier model for a verdict over HTTP, and parses the
//! two-line reply into a [`Verdict`].

#![warn(missing_docs, clippy::pedantic)]

pub mod category;
pub mod failure;
pub mod gate;
pub mod prompt;
pub mod reply;
pub mod verdict;

pub use category::{CategoryCode, HazardCategory};
pub use failure::{GateFailurePolicy, UnknownFailurePolicy};
pub use gate::{GateError, GateResult, ModerationGate, Moderator, evaluate};
pub use prompt::ClassifierPrompt;
pub use reply::parse_reply;
pub use verdict::Verdict;
