//! Configuration for the moderation gate and the secured agent.
//!
//! Settings come from the process environment ([`GuardSettings::from_env`]) or
//! from any key lookup ([`GuardSettings::from_lookup`]).

#![warn(missing_docs, clippy::pedantic)]

mod settings;

pub use settings::{ConfigError, ConfigResult, EndpointSettings, GuardSettings, keys};
