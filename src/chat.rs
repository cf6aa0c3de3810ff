//! Chat prompt templating
//!
//! Formats a system/user message exchange into the token-sequence format the
//! loaded model was trained to expect. The default Qwen-family models use
//! ChatML.

use serde::{Deserialize, Serialize};

/// A role in a chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An ordered list of messages forming one prompt.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Build the two-message exchange the orchestrator sends per generate
    /// call: a system instruction followed by the user prompt.
    pub fn exchange(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Formats conversations into a model-specific prompt string.
pub trait ChatTemplate: Send + Sync {
    /// Render the conversation, appending the generation prompt so the model
    /// continues as the assistant.
    fn apply(&self, conversation: &Conversation) -> String;

    /// Sequences that indicate the end of an assistant response.
    fn stop_sequences(&self) -> Vec<String> {
        vec![]
    }
}

/// ChatML template (Qwen 2/2.5/3, Yi, and friends).
///
/// ```text
/// <|im_start|>system
/// {content}<|im_end|>
/// <|im_start|>user
/// {content}<|im_end|>
/// <|im_start|>assistant
/// ```
#[derive(Debug, Clone)]
pub struct ChatMlTemplate {
    pub add_generation_prompt: bool,
}

impl Default for ChatMlTemplate {
    fn default() -> Self {
        Self {
            add_generation_prompt: true,
        }
    }
}

impl ChatMlTemplate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChatTemplate for ChatMlTemplate {
    fn apply(&self, conversation: &Conversation) -> String {
        let mut prompt = String::new();

        for message in conversation.messages() {
            prompt.push_str(&format!(
                "<|im_start|>{}\n{}<|im_end|>\n",
                message.role, message.content
            ));
        }

        if self.add_generation_prompt {
            prompt.push_str("<|im_start|>assistant\n");
        }

        prompt
    }

    fn stop_sequences(&self) -> Vec<String> {
        vec!["<|im_end|>".to_string(), "<|endoftext|>".to_string()]
    }
}
