//! Secured agent: an LLM call wrapped by two moderation checks.
//!
//! [`SecuredAgent`] screens the user's prompt before the model runs and the
//! model's reply before it is returned, answering with a fixed refusal when
//! either side is judged unsafe.

#![warn(missing_docs, clippy::pedantic)]

mod agent;
mod error;
mod observer;

pub use agent::{
    AgentReply, DEFAULT_INSTRUCTION, DEFAULT_REFUSAL, ReplyOutcome, SecuredAgent,
};
pub use error::{AgentError, AgentResult};
pub use observer::{CompositeVerdictObserver, Screen, TracingVerdictObserver, VerdictObserver};
