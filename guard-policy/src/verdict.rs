//! Verdicts produced by the moderation gate.

use serde::{Deserialize, Serialize};

use crate::category::CategoryCode;

/// Outcome of one moderation check.
///
/// `categories` is non-empty exactly when the verdict is unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVerdict")]
pub struct Verdict {
    safe: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categories: Vec<CategoryCode>,
}

impl Verdict {
    /// Returns a safe verdict.
    #[must_use]
    pub fn safe() -> Self {
        Self {
            safe: true,
            categories: Vec::new(),
        }
    }

    /// Returns an unsafe verdict, or `None` when no category is supplied.
    #[must_use]
    pub fn flagged(categories: Vec<CategoryCode>) -> Option<Self> {
        if categories.is_empty() {
            return None;
        }
        Some(Self {
            safe: false,
            categories,
        })
    }

    /// Returns true when the checked message may pass.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    /// Returns the violated categories in the order the classifier listed them.
    #[must_use]
    pub fn categories(&self) -> &[CategoryCode] {
        &self.categories
    }
}

#[derive(Deserialize)]
struct RawVerdict {
    safe: bool,
    #[serde(default)]
    categories: Vec<CategoryCode>,
}

impl TryFrom<RawVerdict> for Verdict {
    type Error = &'static str;

    fn try_from(raw: RawVerdict) -> Result<Self, Self::Error> {
        match (raw.safe, raw.categories.is_empty()) {
            (true, true) => Ok(Self::safe()),
            (false, false) => Ok(Self {
                safe: false,
                categories: raw.categories,
            }),
            (true, false) => Err("safe verdict cannot carry categories"),
            (false, true) => Err("unsafe verdict requires at least one category"),
        }
    }
}
