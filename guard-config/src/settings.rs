use std::env;
use std::fmt;

use guard_adapters::chat_completions::ChatCompletionsConfig;
use guard_adapters::traits::AdapterResult;
use guard_policy::GateFailurePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable names.
pub mod keys {
    /// Base URL of the classifier's chat-completions API.
    pub const GUARD_BASE_URL: &str = "LLAMA_GUARD_BASE_URL";
    /// Classifier model identifier.
    pub const GUARD_MODEL: &str = "LLAMA_GUARD_MODEL_NAME";
    /// Optional bearer token for the classifier.
    pub const GUARD_API_KEY: &str = "LLAMA_GUARD_API_KEY";
    /// Base URL of the upstream LLM's chat-completions API.
    pub const LLM_BASE_URL: &str = "LLM_BASE_URL";
    /// Upstream LLM model identifier.
    pub const LLM_MODEL: &str = "MODEL_NAME";
    /// Optional bearer token for the upstream LLM.
    pub const LLM_API_KEY: &str = "LLM_API_KEY";
    /// `block`, `allow`, or `surface`; defaults to `block`.
    pub const FAILURE_POLICY: &str = "GUARD_FAILURE_POLICY";
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent or blank.
    #[error("missing required setting `{key}`")]
    Missing {
        /// Environment key.
        key: &'static str,
    },
    /// A key holds an unusable value.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Environment key.
        key: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Where a chat-completions model lives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    base_url: String,
    model: String,
    #[serde(default, skip_serializing)]
    api_key: Option<String>,
}

impl fmt::Debug for EndpointSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EndpointSettings {
    /// Creates endpoint settings without credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
        }
    }

    /// Attaches a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns true when a bearer token is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Builds the adapter configuration for this endpoint.
    ///
    /// # Errors
    ///
    /// Returns the adapter's configuration error when the URL or model is invalid.
    pub fn adapter_config(&self) -> AdapterResult<ChatCompletionsConfig> {
        let config = ChatCompletionsConfig::new(&self.base_url, self.model.clone())?;
        Ok(match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        })
    }
}

/// Complete settings for a secured agent deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSettings {
    classifier: EndpointSettings,
    llm: EndpointSettings,
    #[serde(default)]
    failure_policy: GateFailurePolicy,
}

impl GuardSettings {
    /// Creates settings from explicit endpoints with the fail-closed policy.
    #[must_use]
    pub fn new(classifier: EndpointSettings, llm: EndpointSettings) -> Self {
        Self {
            classifier,
            llm,
            failure_policy: GateFailurePolicy::default(),
        }
    }

    /// Overrides the gate failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: GateFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`GuardSettings::from_lookup`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads only the classifier endpoint from the process environment, for
    /// callers that moderate without an upstream model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a classifier key is absent.
    pub fn classifier_from_env() -> ConfigResult<EndpointSettings> {
        classifier_from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Loads settings through `lookup`, which maps a key from [`keys`] to its value.
    ///
    /// Values are trimmed; blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for absent endpoint keys and
    /// [`ConfigError::Invalid`] for an unknown failure policy.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let classifier = classifier_from_lookup(&lookup)?;
        let llm = endpoint(&lookup, keys::LLM_BASE_URL, keys::LLM_MODEL, keys::LLM_API_KEY)?;

        let failure_policy = match value(&lookup, keys::FAILURE_POLICY) {
            Some(raw) => raw.parse().map_err(|err| ConfigError::Invalid {
                key: keys::FAILURE_POLICY,
                reason: format!("{err}"),
            })?,
            None => GateFailurePolicy::default(),
        };

        let settings = Self {
            classifier,
            llm,
            failure_policy,
        };
        debug!(?settings, "loaded guard settings");
        Ok(settings)
    }

    /// Returns the classifier endpoint.
    #[must_use]
    pub fn classifier(&self) -> &EndpointSettings {
        &self.classifier
    }

    /// Returns the upstream LLM endpoint.
    #[must_use]
    pub fn llm(&self) -> &EndpointSettings {
        &self.llm
    }

    /// Returns the gate failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> GateFailurePolicy {
        self.failure_policy
    }
}

fn value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
}

fn endpoint<F>(
    lookup: &F,
    url_key: &'static str,
    model_key: &'static str,
    api_key_key: &'static str,
) -> ConfigResult<EndpointSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |key: &'static str| value(lookup, key).ok_or(ConfigError::Missing { key });
    let settings = EndpointSettings::new(require(url_key)?, require(model_key)?);
    Ok(match value(lookup, api_key_key) {
        Some(token) => settings.with_api_key(token),
        None => settings,
    })
}

fn classifier_from_lookup<F>(lookup: &F) -> ConfigResult<EndpointSettings>
where
    F: Fn(&str) -> Option<String>,
{
    endpoint(lookup, keys::GUARD_BASE_URL, keys::GUARD_MODEL, keys::GUARD_API_KEY)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 4] = [
        (keys::GUARD_BASE_URL, "http://llama-guard:8000/v1"),
        (keys::GUARD_MODEL, "meta-llama/Llama-Guard-4-12B"),
        (keys::LLM_BASE_URL, "http://vllm:8000/v1"),
        (keys::LLM_MODEL, "google/gemma-3-27b-it"),
    ];

    #[test]
    fn loads_required_endpoints() {
        let settings = GuardSettings::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(settings.classifier().base_url(), "http://llama-guard:8000/v1");
        assert_eq!(settings.classifier().model(), "meta-llama/Llama-Guard-4-12B");
        assert_eq!(settings.llm().model(), "google/gemma-3-27b-it");
        assert!(!settings.llm().has_api_key());
        assert_eq!(settings.failure_policy(), GateFailurePolicy::Block);
    }

    #[test]
    fn missing_or_blank_keys_are_reported() {
        let err = GuardSettings::from_lookup(lookup(&BASE[..3])).expect_err("no model");
        assert_eq!(err, ConfigError::Missing { key: keys::LLM_MODEL });

        let mut pairs = BASE.to_vec();
        pairs[0].1 = "   ";
        let err = GuardSettings::from_lookup(lookup(&pairs)).expect_err("blank url");
        assert_eq!(
            err,
            ConfigError::Missing {
                key: keys::GUARD_BASE_URL
            }
        );
    }

    #[test]
    fn classifier_alone_ignores_llm_keys() {
        let classifier = classifier_from_lookup(&lookup(&BASE[..2])).unwrap();
        assert_eq!(classifier.model(), "meta-llama/Llama-Guard-4-12B");

        let err = classifier_from_lookup(&lookup(&BASE[2..])).expect_err("no guard");
        assert_eq!(
            err,
            ConfigError::Missing {
                key: keys::GUARD_BASE_URL
            }
        );
    }

    #[test]
    fn optional_keys_are_applied() {
        let mut pairs = BASE.to_vec();
        pairs.push((keys::LLM_API_KEY, "sk-test"));
        pairs.push((keys::FAILURE_POLICY, "surface"));

        let settings = GuardSettings::from_lookup(lookup(&pairs)).unwrap();
        assert!(settings.llm().has_api_key());
        assert!(!settings.classifier().has_api_key());
        assert_eq!(settings.failure_policy(), GateFailurePolicy::Surface);
    }

    #[test]
    fn unknown_failure_policy_is_invalid() {
        let mut pairs = BASE.to_vec();
        pairs.push((keys::FAILURE_POLICY, "sometimes"));

        let err = GuardSettings::from_lookup(lookup(&pairs)).expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == keys::FAILURE_POLICY));
    }

    #[test]
    fn api_keys_are_never_serialized_or_printed() {
        let settings = GuardSettings::new(
            EndpointSettings::new("http://guard", "guard").with_api_key("secret-guard"),
            EndpointSettings::new("http://llm", "llm").with_api_key("secret-llm"),
        );

        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains(r#""failure_policy":"block""#));
        assert!(!format!("{settings:?}").contains("secret"));
    }

    #[test]
    fn adapter_config_validates_urls() {
        let good = EndpointSettings::new("http://guard:8000/v1/", "guard");
        assert_eq!(good.adapter_config().unwrap().base_url(), "http://guard:8000/v1");

        let bad = EndpointSettings::new("guard:8000", "guard");
        assert!(bad.adapter_config().is_err());
    }
}
