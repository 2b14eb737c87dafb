//! Prompt templating for classifier and agent instructions.

#![warn(missing_docs, clippy::pedantic)]

pub mod template;

pub use template::{PromptTemplate, TemplateBuilder, TemplateError, TemplateResult};
