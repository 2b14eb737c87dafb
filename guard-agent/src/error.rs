use guard_adapters::traits::AdapterError;
use guard_policy::GateError;
use thiserror::Error;

use crate::observer::Screen;

/// Result alias for agent turns.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors returned by [`SecuredAgent::respond`](crate::SecuredAgent::respond).
#[derive(Debug, Error)]
pub enum AgentError {
    /// The upstream model failed.
    #[error("model inference failed: {0}")]
    Model(#[from] AdapterError),

    /// The moderation gate failed and the failure policy is `surface`.
    #[error("{screen} screening failed: {source}")]
    Gate {
        /// Which side of the turn was being screened.
        screen: Screen,
        /// Underlying gate failure.
        source: GateError,
    },

    /// A message could not be turned into a conversation entry.
    #[error("invalid conversation: {0}")]
    Conversation(#[from] guard_primitives::Error),
}
