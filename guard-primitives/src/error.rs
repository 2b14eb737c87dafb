//! Shared error definitions for conversation primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building conversation primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided turn identifier could not be parsed.
    #[error("invalid turn id: {source}")]
    InvalidTurnId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Message role failed validation.
    #[error("invalid role `{role}`: {reason}")]
    InvalidRole {
        /// The offending role string.
        role: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A conversation must carry at least one message.
    #[error("conversation requires at least one message")]
    EmptyConversation,
}
