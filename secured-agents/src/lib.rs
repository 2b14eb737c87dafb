//! Content-safety guardrails for LLM agents.
//!
//! The moderation gate ([`policy::ModerationGate`]) is always available; the
//! remaining crates sit behind feature flags so callers that only need a verdict
//! can leave out the agent, configuration, and logging layers.
//!
//! ```no_run
//! use secured_agents::policy;
//! use secured_agents::primitives::{ChatMessage, Conversation};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let conversation = Conversation::single(ChatMessage::new("user", "How do I bake bread?")?);
//! let verdict = policy::evaluate(
//!     &conversation,
//!     "user",
//!     "http://llama-guard:8000/v1",
//!     "meta-llama/Llama-Guard-4-12B",
//! )
//! .await?;
//! assert!(verdict.is_safe());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, clippy::pedantic)]

/// Conversation primitives.
pub use guard_primitives as primitives;

/// Moderation gate, verdicts, and hazard categories.
pub use guard_policy as policy;

/// Screened agent turns (enabled by `agent` feature).
#[cfg(feature = "agent")]
pub use guard_agent as agent;

/// Chat-completions adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use guard_adapters as adapters;

/// Prompt templates (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use guard_prompts as prompts;

/// Logging setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use guard_telemetry as telemetry;

/// Environment-driven settings (enabled by `config` feature).
#[cfg(feature = "config")]
pub use guard_config as config;
