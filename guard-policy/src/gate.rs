//! The moderation gate and the [`Moderator`] seam it implements.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use guard_adapters::chat_completions::{ChatCompletionsAdapter, ChatCompletionsConfig};
use guard_adapters::traits::{AdapterError, InferenceRequest, ModelAdapter, collect_text};
use guard_primitives::Conversation;
use guard_prompts::TemplateError;
use thiserror::Error;
use tracing::{debug, info};

use crate::category::CategoryCode;
use crate::prompt::ClassifierPrompt;
use crate::reply::parse_reply;
use crate::verdict::Verdict;

/// Errors surfaced by the moderation gate.
///
/// An unsafe verdict is not an error; see [`Verdict::is_safe`].
#[derive(Debug, Error)]
pub enum GateError {
    /// The classifier endpoint or model identifier is unusable.
    #[error("moderation gate misconfigured: {reason}")]
    Configuration {
        /// Human-readable explanation.
        reason: String,
    },
    /// The classifier could not be reached or answered with an HTTP failure.
    #[error("classifier transport failure: {reason}")]
    Transport {
        /// Human-readable explanation.
        reason: String,
    },
    /// The classifier answered, but not with the two-line verdict contract.
    #[error("malformed classifier response: {reason}")]
    MalformedResponse {
        /// What was wrong with the reply.
        reason: String,
        /// The reply text as received.
        reply: String,
    },
}

impl GateError {
    pub(crate) fn malformed(reason: impl Into<String>, reply: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            reply: reply.to_owned(),
        }
    }
}

impl From<AdapterError> for GateError {
    fn from(err: AdapterError) -> Self {
        if err.is_transport() {
            return Self::Transport {
                reason: err.to_string(),
            };
        }
        match err {
            AdapterError::Response { reason, body } => Self::MalformedResponse {
                reason,
                reply: body,
            },
            other => Self::Configuration {
                reason: other.to_string(),
            },
        }
    }
}

impl From<TemplateError> for GateError {
    fn from(err: TemplateError) -> Self {
        Self::Configuration {
            reason: err.to_string(),
        }
    }
}

/// Result alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Anything that can judge the newest message of a conversation.
#[async_trait]
pub trait Moderator: Send + Sync {
    /// Judges the final message of `conversation`.
    ///
    /// `subject_role` labels the judged messages in the classifier instruction; the
    /// final message is judged whatever its own role is.
    async fn moderate(&self, conversation: &Conversation, subject_role: &str)
    -> GateResult<Verdict>;
}

/// Content-safety gate backed by a classifier model.
///
/// Each call renders the instruction, sends one request, and parses the reply.
/// There is no retry, no caching, and no state carried between calls.
#[derive(Clone)]
pub struct ModerationGate {
    classifier: Arc<dyn ModelAdapter>,
    prompt: ClassifierPrompt,
}

impl fmt::Debug for ModerationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.classifier.metadata();
        f.debug_struct("ModerationGate")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .finish_non_exhaustive()
    }
}

impl ModerationGate {
    /// Creates a gate that classifies through the supplied adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the instruction template fails to build.
    pub fn new(classifier: Arc<dyn ModelAdapter>) -> GateResult<Self> {
        Ok(Self {
            classifier,
            prompt: ClassifierPrompt::new()?,
        })
    }

    /// Creates a gate talking to `{endpoint}/chat/completions` with `model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the endpoint or model is invalid.
    pub fn connect(endpoint: &str, model_id: &str) -> GateResult<Self> {
        Self::from_config(ChatCompletionsConfig::new(endpoint, model_id)?)
    }

    /// Creates a gate from a fully specified adapter configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Configuration`] if the adapter cannot be built.
    pub fn from_config(config: ChatCompletionsConfig) -> GateResult<Self> {
        let adapter = ChatCompletionsAdapter::new(config)?;
        Self::new(Arc::new(adapter))
    }

    /// Judges the final message of `conversation`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Transport`] when the classifier is unreachable or answers
    /// with an HTTP failure, and [`GateError::MalformedResponse`] when the reply does
    /// not follow the verdict format.
    pub async fn evaluate(
        &self,
        conversation: &Conversation,
        subject_role: &str,
    ) -> GateResult<Verdict> {
        let prompt = self.prompt.render(conversation, subject_role)?;
        let model = self.classifier.metadata().model();
        debug!(
            model,
            subject_role,
            messages = conversation.messages().len(),
            "requesting moderation verdict"
        );

        let stream = self.classifier.infer(InferenceRequest::user(prompt)).await?;
        let reply = collect_text(stream).await?;
        let verdict = parse_reply(&reply)?;

        if verdict.is_safe() {
            debug!(model, subject_role, "message judged safe");
        } else {
            let categories = verdict
                .categories()
                .iter()
                .map(CategoryCode::as_str)
                .collect::<Vec<_>>()
                .join(",");
            info!(model, subject_role, categories = %categories, "message judged unsafe");
        }

        Ok(verdict)
    }
}

#[async_trait]
impl Moderator for ModerationGate {
    async fn moderate(
        &self,
        conversation: &Conversation,
        subject_role: &str,
    ) -> GateResult<Verdict> {
        self.evaluate(conversation, subject_role).await
    }
}

/// One-shot check: connects to the classifier, judges the final message, and drops
/// the connection before returning.
///
/// # Errors
///
/// See [`ModerationGate::connect`] and [`ModerationGate::evaluate`].
pub async fn evaluate(
    conversation: &Conversation,
    subject_role: &str,
    endpoint: &str,
    model_id: &str,
) -> GateResult<Verdict> {
    let config = ChatCompletionsConfig::new(endpoint, model_id)?.with_connection_reuse(false);
    ModerationGate::from_config(config)?
        .evaluate(conversation, subject_role)
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;
    use guard_adapters::traits::{AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk};
    use guard_primitives::ChatMessage;

    use super::*;

    /// Classifier double replying with a fixed text and recording every prompt.
    struct ScriptedClassifier {
        metadata: AdapterMetadata,
        reply: Result<String, fn() -> AdapterError>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClassifier {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                metadata: AdapterMetadata::new("scripted", "guard-test"),
                reply: Ok(reply.to_owned()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: fn() -> AdapterError) -> Arc<Self> {
            Arc::new(Self {
                metadata: AdapterMetadata::new("scripted", "guard-test"),
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelAdapter for ScriptedClassifier {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
            assert_eq!(request.messages().len(), 1);
            assert!(request.system_prompt().is_none());
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages()[0].content().to_owned());

            match &self.reply {
                Ok(text) => {
                    let chunk = InferenceChunk::new(text.clone(), true);
                    Ok(Box::pin(stream::once(async move { Ok(chunk) })))
                }
                Err(make) => Err(make()),
            }
        }
    }

    fn conversation(messages: &[(&str, &str)]) -> Conversation {
        Conversation::new(
            messages
                .iter()
                .map(|(role, content)| ChatMessage::new(*role, *content).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn safe_reply_yields_safe_verdict() {
        let classifier = ScriptedClassifier::replying("safe");
        let gate = ModerationGate::new(classifier.clone()).unwrap();

        let verdict = gate
            .evaluate(&conversation(&[("user", "hello")]), "user")
            .await
            .unwrap();

        assert!(verdict.is_safe());
        assert!(verdict.categories().is_empty());
        assert_eq!(classifier.prompts().len(), 1);
    }

    #[tokio::test]
    async fn unsafe_reply_preserves_categories() {
        let gate = ModerationGate::new(ScriptedClassifier::replying("unsafe\nS1,S10")).unwrap();

        let verdict = gate
            .evaluate(&conversation(&[("user", "something bad")]), "user")
            .await
            .unwrap();

        assert!(!verdict.is_safe());
        assert_eq!(
            verdict.categories(),
            [CategoryCode::new("S1"), CategoryCode::new("S10")]
        );
    }

    #[tokio::test]
    async fn unsafe_without_categories_is_malformed() {
        let gate = ModerationGate::new(ScriptedClassifier::replying("unsafe")).unwrap();

        let err = gate
            .evaluate(&conversation(&[("user", "x")]), "user")
            .await
            .expect_err("malformed");
        assert!(matches!(err, GateError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn prompt_carries_ordered_transcript_and_role() {
        let classifier = ScriptedClassifier::replying("safe");
        let gate = ModerationGate::new(classifier.clone()).unwrap();

        gate.evaluate(&conversation(&[("user", "a"), ("model", "b")]), "model")
            .await
            .unwrap();
        gate.evaluate(&conversation(&[("model", "b"), ("user", "a")]), "model")
            .await
            .unwrap();

        let prompts = classifier.prompts();
        assert!(prompts[0].contains("user: a\nmodel: b\n"));
        assert!(prompts[1].contains("model: b\nuser: a\n"));
        assert_ne!(prompts[0], prompts[1]);
        assert!(prompts[0].contains("ONLY THE LAST 'model' message"));
    }

    #[tokio::test]
    async fn repeated_calls_are_idempotent() {
        let classifier = ScriptedClassifier::replying("safe");
        let gate = ModerationGate::new(classifier.clone()).unwrap();
        let convo = conversation(&[("user", "same question")]);

        let first = gate.evaluate(&convo, "user").await.unwrap();
        let second = gate.evaluate(&convo, "user").await.unwrap();

        assert_eq!(first, second);
        let prompts = classifier.prompts();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn transport_failures_are_not_retried() {
        let classifier = ScriptedClassifier::failing(|| AdapterError::transport("refused"));
        let gate = ModerationGate::new(classifier.clone()).unwrap();

        let err = gate
            .evaluate(&conversation(&[("user", "x")]), "user")
            .await
            .expect_err("transport");
        assert!(matches!(err, GateError::Transport { .. }));
        assert_eq!(classifier.prompts().len(), 1);
    }

    #[tokio::test]
    async fn http_status_maps_to_transport() {
        let classifier = ScriptedClassifier::failing(|| AdapterError::Status {
            status: 500,
            body: "boom".into(),
        });
        let gate = ModerationGate::new(classifier).unwrap();

        let err = gate
            .evaluate(&conversation(&[("user", "x")]), "user")
            .await
            .expect_err("status");
        assert!(matches!(err, GateError::Transport { .. }));
    }

    #[tokio::test]
    async fn moderator_trait_delegates_to_evaluate() {
        let gate: Arc<dyn Moderator> =
            Arc::new(ModerationGate::new(ScriptedClassifier::replying("unsafe\nS7")).unwrap());

        let verdict = gate
            .moderate(&conversation(&[("user", "my ssn is...")]), "user")
            .await
            .unwrap();
        assert_eq!(verdict.categories()[0], "S7");
    }

    #[tokio::test]
    async fn undecodable_envelope_keeps_the_raw_body() {
        let classifier = ScriptedClassifier::failing(|| {
            AdapterError::response("expected value at line 1", "<html>bad gateway</html>")
        });
        let gate = ModerationGate::new(classifier).unwrap();

        let err = gate
            .evaluate(&conversation(&[("user", "x")]), "user")
            .await
            .expect_err("malformed envelope");
        match err {
            GateError::MalformedResponse { reason, reply } => {
                assert_eq!(reason, "expected value at line 1");
                assert_eq!(reply, "<html>bad gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connect_rejects_bad_endpoint() {
        let err = ModerationGate::connect("ftp://guard", "llama-guard").expect_err("scheme");
        assert!(matches!(err, GateError::Configuration { .. }));
    }
}
