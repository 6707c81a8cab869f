//! Ordered conversation history sent to the completion service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Conversation history with an optional pinned system prompt.
///
/// The system prompt survives [`ChatHistory::forget`]; everything else is
/// appended in order by the single interactive loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatHistory {
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn with_system(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        Self {
            messages: vec![ChatMessage {
                role: Role::System,
                content: prompt.clone(),
            }],
            system: Some(prompt),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    /// Drop every message except the pinned system prompt.
    pub fn forget(&mut self) {
        self.messages.clear();
        if let Some(prompt) = &self.system {
            self.messages.push(ChatMessage {
                role: Role::System,
                content: prompt.clone(),
            });
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
