//! Turn identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Identifier attached to one request/response turn of a secured agent.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    /// Generates a random turn identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::random()
    }
}

impl Display for TurnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for TurnId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for TurnId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_displayed_turn_id() {
        let id = TurnId::random();
        let parsed = id.to_string().parse::<TurnId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_garbage_turn_id() {
        let err = "not-a-uuid".parse::<TurnId>().expect_err("invalid");
        assert!(matches!(err, Error::InvalidTurnId { .. }));
    }
}
