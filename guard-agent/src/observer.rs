//! Hooks notified of every moderation outcome during a turn.

use std::fmt;
use std::sync::Arc;

use guard_policy::{CategoryCode, GateError, Verdict};
use guard_primitives::TurnId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Side of a turn being screened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// The user's prompt, before the model runs.
    Input,
    /// The model's reply, before it is returned.
    Output,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Observer invoked whenever the agent screens a message.
pub trait VerdictObserver: Send + Sync {
    /// Records the verdict produced for one side of a turn.
    fn on_verdict(&self, turn: TurnId, screen: Screen, verdict: &Verdict);

    /// Records a gate failure, before the failure policy is applied.
    fn on_gate_error(&self, turn: TurnId, screen: Screen, error: &GateError) {
        let _ = (turn, screen, error);
    }
}

/// Observer that emits verdicts to the tracing system.
#[derive(Debug, Default)]
pub struct TracingVerdictObserver;

impl VerdictObserver for TracingVerdictObserver {
    fn on_verdict(&self, turn: TurnId, screen: Screen, verdict: &Verdict) {
        if verdict.is_safe() {
            debug!(%turn, %screen, "screen passed");
        } else {
            let categories: Vec<&str> =
                verdict.categories().iter().map(CategoryCode::as_str).collect();
            info!(%turn, %screen, categories = ?categories, "screen blocked");
        }
    }

    fn on_gate_error(&self, turn: TurnId, screen: Screen, error: &GateError) {
        warn!(%turn, %screen, error = %error, "screen could not be verified");
    }
}

/// Composite observer that forwards to a collection of observers.
#[derive(Default)]
pub struct CompositeVerdictObserver {
    observers: Vec<Arc<dyn VerdictObserver>>,
}

impl CompositeVerdictObserver {
    /// Creates a new composite observer from the supplied list.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn VerdictObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer to the composite set.
    pub fn push(&mut self, observer: Arc<dyn VerdictObserver>) {
        self.observers.push(observer);
    }
}

impl VerdictObserver for CompositeVerdictObserver {
    fn on_verdict(&self, turn: TurnId, screen: Screen, verdict: &Verdict) {
        for observer in &self.observers {
            observer.on_verdict(turn, screen, verdict);
        }
    }

    fn on_gate_error(&self, turn: TurnId, screen: Screen, error: &GateError) {
        for observer in &self.observers {
            observer.on_gate_error(turn, screen, error);
        }
    }
}
