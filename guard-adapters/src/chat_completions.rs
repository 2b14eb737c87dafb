//! Adapter for OpenAI-compatible `/chat/completions` endpoints.
//!
//! The base URL is used as given (e.g. `http://vllm:8000/v1`); requests go to
//! `{base}/chat/completions`.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::body::to_bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::{HyperClient, build_client};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    MessageRole, ModelAdapter, PromptMessage,
};

/// Provider identifier reported through [`AdapterMetadata`].
pub const PROVIDER: &str = "chat-completions";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the [`ChatCompletionsAdapter`].
#[derive(Clone, Debug)]
pub struct ChatCompletionsConfig {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    reuse_connections: bool,
}

impl ChatCompletionsConfig {
    /// Creates a configuration for the supplied base URL and model identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the base URL lacks an
    /// `http://`/`https://` scheme or does not parse, or the model is blank.
    pub fn new(base_url: impl AsRef<str>, model: impl Into<String>) -> AdapterResult<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(AdapterError::configuration("model identifier cannot be empty"));
        }

        Ok(Self {
            base_url: sanitize_base_url(base_url.as_ref())?,
            model,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            reuse_connections: true,
        })
    }

    /// Supplies a bearer token sent in the `Authorization` header.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Controls whether idle connections are pooled between requests.
    #[must_use]
    pub fn with_connection_reuse(mut self, reuse: bool) -> Self {
        self.reuse_connections = reuse;
        self
    }

    /// Returns the sanitized base URL (without a trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Adapter posting chat-completion requests to an OpenAI-compatible endpoint.
pub struct ChatCompletionsAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for ChatCompletionsAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint URI is invalid.
    pub fn new(config: ChatCompletionsConfig) -> AdapterResult<Self> {
        let endpoint = format!("{}/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid endpoint: {err}")))?;

        Ok(Self {
            client: build_client(config.reuse_connections),
            endpoint,
            metadata: AdapterMetadata::new(PROVIDER, config.model),
            api_key: config.api_key,
            timeout: config.timeout,
        })
    }

    /// Returns the full `/chat/completions` endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatCompletionRequest {
        let system = request
            .system_prompt()
            .map(|prompt| WireMessage {
                role: MessageRole::System.as_str(),
                content: prompt.to_owned(),
            });
        let messages = system
            .into_iter()
            .chain(request.messages().iter().map(map_prompt_message))
            .collect();

        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages,
            temperature: request.temperature(),
            max_tokens: request.max_output_tokens(),
        }
    }

    async fn post(&self, payload: &ChatCompletionRequest) -> AdapterResult<String> {
        let body = serde_json::to_vec(payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode chat request: {err}"))
        })?;

        let mut builder =
            Request::post(self.endpoint.clone()).header(CONTENT_TYPE, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let request = builder
            .body(Body::from(body))
            .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

        // Headers and body share one ceiling; a stalled body must not outlive it.
        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|err| AdapterError::transport(format!("chat request failed: {err}")))?;
            let status = response.status();
            let bytes = to_bytes(response.into_body()).await.map_err(|err| {
                AdapterError::transport(format!("failed to read chat response: {err}"))
            })?;
            Ok::<_, AdapterError>((status, bytes))
        };

        let (status, bytes) = timeout(self.timeout, exchange).await.map_err(|_| {
            AdapterError::transport(format!("chat request timed out after {:?}", self.timeout))
        })??;

        if !status.is_success() {
            return Err(AdapterError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let response: ChatCompletionResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(
                format!("failed to decode chat response: {err}"),
                String::from_utf8_lossy(&bytes),
            )
        })?;

        Ok(response.into_content())
    }
}

#[async_trait]
impl ModelAdapter for ChatCompletionsAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            endpoint = %self.endpoint,
            "posting chat completion"
        );

        let content = self.post(&payload).await?;
        let stream = stream::once(async move { Ok(InferenceChunk::new(content, true)) });
        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// First non-null `message.content`; empty when no choice carries one.
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .find_map(|choice| choice.message.and_then(|message| message.content))
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_prompt_message(message: &PromptMessage) -> WireMessage {
    WireMessage {
        role: message.role().as_str(),
        content: message.content().to_owned(),
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let base = input.trim().trim_end_matches('/');
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "base URL must start with http:// or https://",
        ));
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid base URL: {err}")))?;
    Ok(base.to_owned())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use hyper::Response;
    use hyper::body::Sender;
    use hyper::server::Server;
    use hyper::service::{make_service_fn, service_fn};
    use serde_json::json;

    use super::*;

    fn adapter() -> ChatCompletionsAdapter {
        let config = ChatCompletionsConfig::new("http://localhost:8000/v1", "llama-guard")
            .expect("config");
        ChatCompletionsAdapter::new(config).expect("adapter")
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = ChatCompletionsConfig::new("localhost:8000", "m").expect_err("no scheme");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn blank_model_is_rejected() {
        let err = ChatCompletionsConfig::new("http://localhost", "  ").expect_err("blank");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn endpoint_appends_chat_completions() {
        let cfg = ChatCompletionsConfig::new(" https://gw.example.com/v1/ ", "m").unwrap();
        assert_eq!(cfg.base_url(), "https://gw.example.com/v1");

        let adapter = ChatCompletionsAdapter::new(cfg).unwrap();
        assert_eq!(
            adapter.endpoint().to_string(),
            "https://gw.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn minimal_request_serializes_model_and_messages_only() {
        let adapter = adapter();
        let payload = adapter.build_request(&InferenceRequest::user("classify me"));

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama-guard",
                "messages": [{ "role": "user", "content": "classify me" }]
            })
        );
    }

    #[test]
    fn system_prompt_is_sent_first() {
        let adapter = adapter();
        let request = InferenceRequest::user("hello")
            .with_system_prompt("be helpful")
            .with_max_output_tokens(64);

        let payload = adapter.build_request(&request);
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, "system");
        assert_eq!(payload.messages[1].role, "user");
        assert_eq!(payload.max_tokens, Some(64));
    }

    #[test]
    fn response_content_takes_first_present_message() {
        let json = r#"{
            "choices": [
                { "message": null },
                { "message": { "content": "unsafe\nS1" } }
            ]
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_content(), "unsafe\nS1");

        let empty: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.into_content(), "");
    }

    #[tokio::test]
    async fn stalled_body_is_bounded_by_the_ceiling() {
        // The server sends headers, then never writes a byte of the body.
        let open_bodies: Arc<Mutex<Vec<Sender>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&open_bodies);
        let make = make_service_fn(move |_conn| {
            let sink = Arc::clone(&sink);
            async move {
                Ok::<_, Infallible>(service_fn(move |_req: Request<Body>| {
                    let (sender, body) = Body::channel();
                    sink.lock().unwrap().push(sender);
                    async move { Ok::<_, Infallible>(Response::new(body)) }
                }))
            }
        });
        let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(make);
        let addr = server.local_addr();
        tokio::spawn(server);

        let config = ChatCompletionsConfig::new(format!("http://{addr}/v1"), "guard")
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let adapter = ChatCompletionsAdapter::new(config).unwrap();

        let outcome = timeout(Duration::from_secs(5), adapter.infer(InferenceRequest::user("x")))
            .await
            .expect("adapter ceiling should fire first");
        let Err(err) = outcome else {
            panic!("stalled body produced a reply");
        };
        assert!(matches!(err, AdapterError::Transport { .. }), "{err:?}");
        assert_eq!(open_bodies.lock().unwrap().len(), 1);
    }
}
