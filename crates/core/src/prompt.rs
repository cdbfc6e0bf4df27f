use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a helpful assistant. Answer strictly from the \
provided context. If the context does not contain the answer, say that you do not know.";

const DEFAULT_USER_TEMPLATE: &str = "Context:\n{context}\n\nQuestion: {query}\n\nAnswer:";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

/// Ordered two-message prompt: system first, then the rendered user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
}

/// Prompt templates are configuration, not logic. `{query}` and `{context}`
/// placeholders in the user template are substituted at build time.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            user: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Loads `system.txt` and `user.txt` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        Ok(Self {
            system: fs::read_to_string(dir.join("system.txt"))?,
            user: fs::read_to_string(dir.join("user.txt"))?,
        })
    }
}

pub fn build_prompt(templates: &PromptTemplates, query: &str, context: &str) -> Prompt {
    let user = templates
        .user
        .replace("{query}", query)
        .replace("{context}", context);

    Prompt {
        messages: vec![
            ChatMessage::system(templates.system.clone()),
            ChatMessage::user(user),
        ],
    }
}
