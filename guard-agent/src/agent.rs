//! Secured agent turn pipeline.

use std::fmt;
use std::sync::Arc;

use guard_adapters::traits::{InferenceRequest, MessageRole, ModelAdapter, collect_text};
use guard_policy::{CategoryCode, GateFailurePolicy, Moderator};
use guard_primitives::{ChatMessage, Conversation, TurnId};
use serde::Serialize;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{AgentError, AgentResult};
use crate::observer::{Screen, VerdictObserver};

/// Default system prompt for the upstream model.
pub const DEFAULT_INSTRUCTION: &str =
    "You are a helpful assistant. Please respond to the user's query.";

/// Default reply returned when a turn is blocked.
pub const DEFAULT_REFUSAL: &str =
    "The prompt can not be processed. Please adjust it and try again.";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Both screens passed; the text is the model's reply.
    Answered,
    /// The user's prompt was judged unsafe; the model was not called.
    BlockedInput {
        /// Violated categories.
        categories: Vec<CategoryCode>,
    },
    /// The model's reply was judged unsafe and withheld.
    BlockedOutput {
        /// Violated categories.
        categories: Vec<CategoryCode>,
    },
    /// The gate failed and the failure policy blocked the turn.
    Unverified {
        /// Screen whose check failed.
        screen: Screen,
    },
}

/// Reply produced by [`SecuredAgent::respond`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReply {
    turn: TurnId,
    text: String,
    #[serde(flatten)]
    outcome: ReplyOutcome,
}

impl AgentReply {
    /// Returns the turn identifier used in logs.
    #[must_use]
    pub const fn turn(&self) -> TurnId {
        self.turn
    }

    /// Returns the text to show the user.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns how the turn ended.
    #[must_use]
    pub fn outcome(&self) -> &ReplyOutcome {
        &self.outcome
    }

    /// Returns true when the reply is the refusal text.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !matches!(self.outcome, ReplyOutcome::Answered)
    }

    /// Consumes the reply, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// LLM agent whose input and output are both screened by a [`Moderator`].
///
/// The final message of each screened conversation is judged, with its own role
/// used as the subject label: the user prompt on the way in, the model reply on
/// the way out.
#[derive(Clone)]
pub struct SecuredAgent {
    model: Arc<dyn ModelAdapter>,
    moderator: Arc<dyn Moderator>,
    instruction: String,
    refusal: String,
    failure_policy: GateFailurePolicy,
    observer: Option<Arc<dyn VerdictObserver>>,
}

impl fmt::Debug for SecuredAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.model.metadata();
        f.debug_struct("SecuredAgent")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .field("failure_policy", &self.failure_policy)
            .field("observer_configured", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl SecuredAgent {
    /// Creates an agent with the default instruction, refusal, and fail-closed policy.
    #[must_use]
    pub fn new(model: Arc<dyn ModelAdapter>, moderator: Arc<dyn Moderator>) -> Self {
        Self {
            model,
            moderator,
            instruction: DEFAULT_INSTRUCTION.to_owned(),
            refusal: DEFAULT_REFUSAL.to_owned(),
            failure_policy: GateFailurePolicy::default(),
            observer: None,
        }
    }

    /// Replaces the system prompt sent to the model.
    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Replaces the text returned for blocked turns.
    #[must_use]
    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }

    /// Chooses what happens when the gate cannot produce a verdict.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: GateFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Installs an observer notified of every screen.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn VerdictObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the configured failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> GateFailurePolicy {
        self.failure_policy
    }

    /// Runs one screened turn for `user_text`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Model`] when the upstream model fails, and
    /// [`AgentError::Gate`] when the gate fails under [`GateFailurePolicy::Surface`].
    pub async fn respond(&self, user_text: &str) -> AgentResult<AgentReply> {
        let turn = TurnId::random();
        let span = info_span!("secured_turn", %turn);
        self.run_turn(turn, user_text).instrument(span).await
    }

    async fn run_turn(&self, turn: TurnId, user_text: &str) -> AgentResult<AgentReply> {
        let prompt = ChatMessage::new(MessageRole::User.as_str(), user_text)?;
        let input = Conversation::single(prompt);
        if let Some(outcome) = self.screen(turn, Screen::Input, &input).await? {
            return Ok(self.refuse(turn, outcome));
        }

        let request =
            InferenceRequest::user(user_text).with_system_prompt(self.instruction.as_str());
        let reply = collect_text(self.model.infer(request).await?).await?;
        debug!(chars = reply.len(), "model replied");

        let answer = ChatMessage::new(MessageRole::Assistant.as_str(), reply.as_str())?;
        let output = input.with_message(answer);
        if let Some(outcome) = self.screen(turn, Screen::Output, &output).await? {
            return Ok(self.refuse(turn, outcome));
        }

        Ok(AgentReply {
            turn,
            text: reply,
            outcome: ReplyOutcome::Answered,
        })
    }

    /// Returns the blocking outcome, or `None` when the turn may continue.
    async fn screen(
        &self,
        turn: TurnId,
        screen: Screen,
        conversation: &Conversation,
    ) -> AgentResult<Option<ReplyOutcome>> {
        let subject_role = conversation.last().role();

        match self.moderator.moderate(conversation, subject_role).await {
            Ok(verdict) => {
                if let Some(observer) = &self.observer {
                    observer.on_verdict(turn, screen, &verdict);
                }
                if verdict.is_safe() {
                    return Ok(None);
                }
                let categories = verdict.categories().to_vec();
                Ok(Some(match screen {
                    Screen::Input => ReplyOutcome::BlockedInput { categories },
                    Screen::Output => ReplyOutcome::BlockedOutput { categories },
                }))
            }
            Err(source) => {
                if let Some(observer) = &self.observer {
                    observer.on_gate_error(turn, screen, &source);
                }
                match self.failure_policy {
                    GateFailurePolicy::Block => Ok(Some(ReplyOutcome::Unverified { screen })),
                    GateFailurePolicy::Allow => {
                        warn!(%screen, error = %source, "moderation unavailable, passing through");
                        Ok(None)
                    }
                    GateFailurePolicy::Surface => Err(AgentError::Gate { screen, source }),
                }
            }
        }
    }

    fn refuse(&self, turn: TurnId, outcome: ReplyOutcome) -> AgentReply {
        AgentReply {
            turn,
            text: self.refusal.clone(),
            outcome,
        }
    }
}
