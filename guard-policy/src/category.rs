//! Unsafe-content categories understood by the classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The thirteen hazard classes listed in the classifier instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HazardCategory {
    /// `S1`
    ViolentCrimes,
    /// `S2`
    NonViolentCrimes,
    /// `S3`
    SexCrimes,
    /// `S4`
    ChildExploitation,
    /// `S5`
    Defamation,
    /// `S6`
    SpecializedAdvice,
    /// `S7`
    Privacy,
    /// `S8`
    IntellectualProperty,
    /// `S9`
    IndiscriminateWeapons,
    /// `S10`
    Hate,
    /// `S11`
    SelfHarm,
    /// `S12`
    SexualContent,
    /// `S13`
    Elections,
}

impl HazardCategory {
    /// Every category, in code order.
    pub const ALL: [Self; 13] = [
        Self::ViolentCrimes,
        Self::NonViolentCrimes,
        Self::SexCrimes,
        Self::ChildExploitation,
        Self::Defamation,
        Self::SpecializedAdvice,
        Self::Privacy,
        Self::IntellectualProperty,
        Self::IndiscriminateWeapons,
        Self::Hate,
        Self::SelfHarm,
        Self::SexualContent,
        Self::Elections,
    ];

    /// Returns the short code (`S1`..`S13`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ViolentCrimes => "S1",
            Self::NonViolentCrimes => "S2",
            Self::SexCrimes => "S3",
            Self::ChildExploitation => "S4",
            Self::Defamation => "S5",
            Self::SpecializedAdvice => "S6",
            Self::Privacy => "S7",
            Self::IntellectualProperty => "S8",
            Self::IndiscriminateWeapons => "S9",
            Self::Hate => "S10",
            Self::SelfHarm => "S11",
            Self::SexualContent => "S12",
            Self::Elections => "S13",
        }
    }

    /// Returns the human-readable name used in the classifier instruction.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ViolentCrimes => "Violent Crimes",
            Self::NonViolentCrimes => "Non-Violent Crimes",
            Self::SexCrimes => "Sex Crimes",
            Self::ChildExploitation => "Child Exploitation",
            Self::Defamation => "Defamation",
            Self::SpecializedAdvice => "Specialized Advice",
            Self::Privacy => "Privacy",
            Self::IntellectualProperty => "Intellectual Property",
            Self::IndiscriminateWeapons => "Indiscriminate Weapons",
            Self::Hate => "Hate",
            Self::SelfHarm => "Self-Harm",
            Self::SexualContent => "Sexual Content",
            Self::Elections => "Elections",
        }
    }

    /// Looks up a category by its exact code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.code() == code)
    }
}

impl fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.name())
    }
}

/// A category code exactly as the classifier returned it.
///
/// Codes are not trimmed or checked against [`HazardCategory`]; use
/// [`CategoryCode::category`] to resolve a known one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCode(String);

impl CategoryCode {
    /// Wraps a raw code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the raw code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the code to a known category, if it is one.
    #[must_use]
    pub fn category(&self) -> Option<HazardCategory> {
        HazardCategory::from_code(&self.0)
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HazardCategory> for CategoryCode {
    fn from(value: HazardCategory) -> Self {
        Self(value.code().to_owned())
    }
}

impl PartialEq<str> for CategoryCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CategoryCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
