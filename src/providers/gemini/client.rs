use crate::core::error::AppError;
use crate::providers::gemini::types::*;
use crate::providers::{Message, ModelReply, Role, ToolDeclaration};
use reqwest::Client;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    pub model: String,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    pub async fn generate_content(
        &self,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<ModelReply, AppError> {
        let payload = self.build_payload(messages, tools);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!(
                "model request failed ({}): {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::Serialization(format!("Failed to parse model response: {}", e))
        })?;

        Self::extract_reply(parsed)
    }

    /// The first function call in the candidate wins; otherwise every text
    /// part is concatenated into one reply.
    fn extract_reply(parsed: GeminiResponse) -> Result<ModelReply, AppError> {
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Api("No valid response from the model".to_string()))?;

        let mut text = String::new();
        for part in candidate.content.parts {
            if let Some(call) = part.function_call {
                return Ok(ModelReply::ToolCall {
                    name: call.name,
                    args: call.args,
                });
            }
            if let Some(chunk) = part.text {
                text.push_str(&chunk);
            }
        }

        if text.is_empty() {
            Err(AppError::Api("No valid response from the model".to_string()))
        } else {
            Ok(ModelReply::Text(text))
        }
    }

    fn build_payload(&self, messages: &[Message], tools: &[ToolDeclaration]) -> GeminiRequest {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for message in messages {
            match message.role {
                Role::System => {
                    if system_instruction.is_none() {
                        system_instruction = Some(SystemInstruction {
                            parts: vec![GeminiPart {
                                text: message.content.clone(),
                            }],
                        });
                    }
                }
                Role::User | Role::Assistant => {
                    let role = if message.role == Role::User {
                        "user"
                    } else {
                        "model"
                    };
                    contents.push(GeminiContent {
                        role: role.to_string(),
                        parts: vec![GeminiPart {
                            text: message.content.clone(),
                        }],
                    });
                }
            }
        }

        let (tools, tool_config) = if tools.is_empty() {
            (None, None)
        } else {
            (
                Some(vec![GeminiTool {
                    function_declarations: tools.to_vec(),
                }]),
                Some(GeminiToolConfig {
                    function_calling_config: FunctionCallingConfig {
                        mode: "AUTO".to_string(),
                    },
                }),
            )
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig { temperature: 0.7 },
            tools,
            tool_config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn declarations() -> Vec<ToolDeclaration> {
        vec![ToolDeclaration {
            name: "list_events",
            description: "Lists events based on time filter",
            parameters: json!({ "type": "object", "properties": {} }),
        }]
    }

    #[tokio::test]
    async fn function_call_part_wins_over_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .query_param("key", "test-key")
                .json_body_includes(r#"{ "generationConfig": { "temperature": 0.7 } }"#);
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Working on it" },
                            { "functionCall": { "name": "list_events", "args": { "event_type": "upcoming" } } }
                        ]
                    }
                }]
            }));
        });

        let client = GeminiClient::new(
            server.base_url(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        let reply = client
            .generate_content(&[Message::user("show upcoming events")], &declarations())
            .await
            .unwrap();

        mock.assert();
        match reply {
            ModelReply::ToolCall { name, args } => {
                assert_eq!(name, "list_events");
                assert_eq!(args["event_type"], "upcoming");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn free_text_passes_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Hello! " }, { "text": "How can I help?" }] }
                }]
            }));
        });

        let client = GeminiClient::new(
            server.base_url(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        let reply = client
            .generate_content(&[Message::user("hi")], &[])
            .await
            .unwrap();

        assert_eq!(reply, ModelReply::Text("Hello! How can I help?".to_string()));
    }

    #[tokio::test]
    async fn tool_declarations_are_sent_when_present() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .body_includes("functionDeclarations")
                .body_includes("\"mode\":\"AUTO\"");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            }));
        });

        let client = GeminiClient::new(
            server.base_url(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        client
            .generate_content(&[Message::user("hi")], &declarations())
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn upstream_error_carries_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent");
            then.status(429).body("quota exceeded");
        });

        let client = GeminiClient::new(
            server.base_url(),
            "test-key".to_string(),
            "gemini-2.5-flash".to_string(),
        );
        let err = client
            .generate_content(&[Message::user("hi")], &[])
            .await
            .unwrap_err();

        let rendered = err.to_string();
        assert!(rendered.contains("429"));
        assert!(rendered.contains("quota exceeded"));
    }

    #[test]
    fn system_messages_become_the_instruction_not_a_turn() {
        let client = GeminiClient::new(
            "http://localhost".to_string(),
            "k".to_string(),
            "m".to_string(),
        );
        let payload = client.build_payload(
            &[
                Message::system("You are an assistant"),
                Message::user("hello"),
                Message::assistant("hi"),
                Message::user("show events"),
            ],
            &[],
        );

        assert!(payload.system_instruction.is_some());
        assert_eq!(payload.contents.len(), 3);
        assert_eq!(payload.contents[0].role, "user");
        assert_eq!(payload.contents[1].role, "model");
        assert_eq!(payload.contents[2].role, "user");
    }
}
