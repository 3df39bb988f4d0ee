//! Conversation messages and parsing of the inbound chat payload.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Wire shape of one inbound message. `content` stays optional here so a
/// missing field surfaces as a validation failure instead of a decode error.
#[derive(Debug, Serialize, Deserialize)]
struct InboundMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(transparent)]
struct ChatRequest {
    #[validate(
        length(min = 1, message = "conversation must contain at least one message"),
        custom = "last_message_has_content"
    )]
    messages: Vec<InboundMessage>,
}

fn last_message_has_content(messages: &Vec<InboundMessage>) -> Result<(), ValidationError> {
    let has_text = messages
        .last()
        .and_then(|m| m.content.as_deref())
        .map(|c| !c.trim().is_empty())
        .unwrap_or(true);

    if has_text {
        Ok(())
    } else {
        let mut err = ValidationError::new("last_message_content");
        err.message = Some(Cow::from("last message must have text content"));
        Err(err)
    }
}

/// The parsed history. Always holds at least one message and the last one
/// always carries non-blank text.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Builds a conversation from already-typed messages, applying the same
    /// rules as [`parse_history`].
    pub fn new(messages: Vec<Message>) -> Result<Self, ChatError> {
        match messages.last() {
            None => Err(ChatError::Validation(
                "conversation must contain at least one message".to_string(),
            )),
            Some(last) if last.content.trim().is_empty() => Err(ChatError::Validation(
                "last message must have text content".to_string(),
            )),
            Some(_) => Ok(Self { messages }),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> &Message {
        // Non-empty by construction
        &self.messages[self.messages.len() - 1]
    }

    /// Everything before the last message, in original order.
    pub fn prior(&self) -> &[Message] {
        &self.messages[..self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Parses the raw request body: a JSON array of `{role, content}` objects.
pub fn parse_history(body: &[u8]) -> Result<Conversation, ChatError> {
    let request: ChatRequest = serde_json::from_slice(body)
        .map_err(|e| ChatError::Validation(format!("body must be a JSON array of messages: {}", e)))?;

    request.validate().map_err(|errors| {
        let reasons: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        ChatError::Validation(reasons.join("; "))
    })?;

    let messages = request
        .messages
        .into_iter()
        .map(|m| Message::new(m.role, m.content.unwrap_or_default()))
        .collect();

    Conversation::new(messages)
}
