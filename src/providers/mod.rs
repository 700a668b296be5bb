use crate::core::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub mod gemini;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One callable operation advertised to the model: its name, what it is
/// for, and a typed parameter schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// What the model decided to do with a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall { name: String, args: Value },
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn get_reply(
        &self,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<ModelReply, AppError>;
}
