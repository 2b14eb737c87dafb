//! Core shared types for moderated conversations.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod message;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier correlating the log lines of a single agent turn.
pub use ids::TurnId;
/// Role-tagged messages and the conversations built from them.
pub use message::{ChatMessage, Conversation, MAX_ROLE_LEN};
