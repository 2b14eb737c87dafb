//! Code-based prompt template system with variable substitution.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Errors that can occur during template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A required variable was not provided.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// The template definition is inconsistent.
    #[error("invalid template: {reason}")]
    Invalid {
        /// Reason for the failure.
        reason: String,
    },
}

/// A prompt template with `{{variable}}` placeholders.
///
/// Rendering is a single left-to-right pass: values are inserted verbatim and never
/// scanned for further placeholders, so user-supplied text containing `{{...}}`
/// cannot pull in other variables. Unterminated `{{` sequences are kept as-is.
///
/// # Examples
///
/// ```
/// use guard_prompts::PromptTemplate;
///
/// let template = PromptTemplate::builder("Check '{{role}}' messages.")
///     .with_required_variable("role")
///     .build()
///     .unwrap();
///
/// let rendered = template
///     .render_with(&[("role".to_owned(), "user".to_owned())].into())
///     .unwrap();
/// assert_eq!(rendered, "Check 'user' messages.");
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptTemplate {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl PromptTemplate {
    /// Creates a new template with the supplied text and no variables.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
            required_variables: Vec::new(),
        }
    }

    /// Returns a builder for constructing templates.
    #[must_use]
    pub fn builder(template: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder::new(template)
    }

    /// Sets a default variable value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Returns the default value of a variable if set.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Renders the template with its default variables.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render(&self) -> TemplateResult<String> {
        self.render_with(&HashMap::new())
    }

    /// Renders the template with additional runtime variables.
    ///
    /// Runtime variables override defaults. Optional variables with no value render
    /// as the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a required variable is not set.
    pub fn render_with(&self, runtime_vars: &HashMap<String, String>) -> TemplateResult<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find(OPEN) {
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(CLOSE) else {
                break;
            };

            out.push_str(&rest[..start]);
            let name = after[..end].trim();
            if name.is_empty() {
                out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]);
            } else if let Some(value) = runtime_vars
                .get(name)
                .or_else(|| self.variables.get(name))
            {
                out.push_str(value);
            } else if self.required_variables.iter().any(|required| required == name) {
                return Err(TemplateError::MissingVariable {
                    name: name.to_owned(),
                });
            }

            rest = &after[end + CLOSE.len()..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Returns the placeholder names in order of appearance, repeats included.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        placeholders(&self.template)
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the configured default variables.
    #[must_use]
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Builder for constructing prompt templates.
#[derive(Debug)]
pub struct TemplateBuilder {
    template: String,
    variables: HashMap<String, String>,
    required_variables: Vec<String>,
}

impl TemplateBuilder {
    /// Creates a new builder with the supplied template text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            variables: HashMap::new(),
            required_variables: Vec::new(),
        }
    }

    /// Sets a variable with a default value.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Declares a required variable (must be provided at render time).
    #[must_use]
    pub fn with_required_variable(mut self, name: impl Into<String>) -> Self {
        self.required_variables.push(name.into());
        self
    }

    /// Builds the template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Invalid`] if a required variable never appears as a
    /// placeholder in the template text.
    pub fn build(self) -> TemplateResult<PromptTemplate> {
        let present = placeholders(&self.template);
        if let Some(unused) = self
            .required_variables
            .iter()
            .find(|name| !present.contains(&name.as_str()))
        {
            return Err(TemplateError::Invalid {
                reason: format!("required variable `{unused}` is not referenced"),
            });
        }

        Ok(PromptTemplate {
            template: self.template,
            variables: self.variables,
            required_variables: self.required_variables,
        })
    }
}

fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            break;
        };
        let name = after[..end].trim();
        if !name.is_empty() {
            names.push(name);
        }
        rest = &after[end + CLOSE.len()..];
    }
    names
}
