//! Role-tagged chat messages and conversations.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length accepted for a message role.
pub const MAX_ROLE_LEN: usize = 32;

/// A single message of a conversation.
///
/// Roles are short free-form tokens (`user`, `model`, `assistant`, ...). They may not
/// contain whitespace or `:`, since the transcript uses `role: content` lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChatMessage")]
pub struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    /// Creates a message after validating its role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRole`] if the role is empty, longer than
    /// [`MAX_ROLE_LEN`], or contains whitespace or `:`.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let role = role.into();
        validate_role(&role)?;
        Ok(Self {
            role,
            content: content.into(),
        })
    }

    /// Returns the message role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the message content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Deserialize)]
struct RawChatMessage {
    role: String,
    content: String,
}

impl TryFrom<RawChatMessage> for ChatMessage {
    type Error = Error;

    fn try_from(raw: RawChatMessage) -> Result<Self> {
        Self::new(raw.role, raw.content)
    }
}

fn validate_role(role: &str) -> Result<()> {
    if role.is_empty() {
        return Err(Error::InvalidRole {
            role: String::new(),
            reason: "role cannot be empty".into(),
        });
    }

    if role.chars().count() > MAX_ROLE_LEN {
        return Err(Error::InvalidRole {
            role: role.into(),
            reason: format!("role length must be <= {MAX_ROLE_LEN}"),
        });
    }

    if role.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(Error::InvalidRole {
            role: role.into(),
            reason: "role cannot contain whitespace or ':'".into(),
        });
    }

    Ok(())
}

/// Ordered, non-empty sequence of messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChatMessage>", into = "Vec<ChatMessage>")]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Creates a conversation from the supplied messages, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyConversation`] when `messages` is empty.
    pub fn new(messages: Vec<ChatMessage>) -> Result<Self> {
        if messages.is_empty() {
            return Err(Error::EmptyConversation);
        }
        Ok(Self { messages })
    }

    /// Creates a conversation holding a single message.
    #[must_use]
    pub fn single(message: ChatMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }

    /// Appends a message to the end of the conversation.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Appends a message and returns the updated conversation.
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.push(message);
        self
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the newest message.
    #[must_use]
    pub fn last(&self) -> &ChatMessage {
        // `new` and `single` guarantee at least one message and nothing removes them.
        &self.messages[self.messages.len() - 1]
    }

    /// Renders the conversation as `role: content` lines, each terminated by `\n`.
    #[must_use]
    pub fn transcript(&self) -> String {
        let capacity = self
            .messages
            .iter()
            .map(|m| m.role.len() + m.content.len() + 3)
            .sum();
        let mut out = String::with_capacity(capacity);
        for message in &self.messages {
            let _ = writeln!(out, "{}: {}", message.role, message.content);
        }
        out
    }
}

impl TryFrom<Vec<ChatMessage>> for Conversation {
    type Error = Error;

    fn try_from(messages: Vec<ChatMessage>) -> Result<Self> {
        Self::new(messages)
    }
}

impl From<Conversation> for Vec<ChatMessage> {
    fn from(value: Conversation) -> Self {
        value.messages
    }
}
