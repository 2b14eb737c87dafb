//! What a caller does when the gate cannot produce a verdict.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Resolution applied when moderation fails with a transport or malformed-reply
/// error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFailurePolicy {
    /// Fail closed: treat the message as blocked.
    #[default]
    Block,
    /// Fail open: let the message through unverified.
    Allow,
    /// Return the gate error to the caller.
    Surface,
}

impl GateFailurePolicy {
    /// Returns the configuration spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Allow => "allow",
            Self::Surface => "surface",
        }
    }
}

impl fmt::Display for GateFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gate failure policy `{0}` (expected block, allow, or surface)")]
pub struct UnknownFailurePolicy(pub String);

impl FromStr for GateFailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" | "closed" | "fail-closed" => Ok(Self::Block),
            "allow" | "open" | "fail-open" => Ok(Self::Allow),
            "surface" | "error" => Ok(Self::Surface),
            _ => Err(UnknownFailurePolicy(s.to_owned())),
        }
    }
}
