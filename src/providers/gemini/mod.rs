use crate::core::error::AppError;
use crate::providers::{Message, ModelProvider, ModelReply, ToolDeclaration};
use async_trait::async_trait;

mod client;
mod types;

pub use client::GeminiClient;

#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: GeminiClient::new(base_url, api_key, model),
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn get_reply(
        &self,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<ModelReply, AppError> {
        self.client.generate_content(messages, tools).await
    }
}
