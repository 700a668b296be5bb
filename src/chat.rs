//! Turns a client transcript into one assistant reply. The transcript
//! lives on the client and is resent whole; only the final entry is the
//! current turn, everything before it is context.

use tracing::info;

use crate::core::error::{AppError, AppResult};
use crate::models::{ChatMessage, ChatRole};
use crate::providers::{Message, ModelProvider, ModelReply};
use crate::store::Store;
use crate::tools;

pub const SYSTEM_INSTRUCTION: &str = "You are a concise event management assistant. \
Keep responses SHORT and conversational. When creating events, gather ALL required \
information (title, description, date, banner_url) before calling create_event. \
Ask for one piece at a time. Use Markdown formatting with emojis.";

/// Shapes the transcript for the model: system instruction first, then
/// prior turns, then the current user turn. A seeded assistant greeting
/// at the front of the transcript carries no user intent and is dropped.
fn build_prompt(messages: &[ChatMessage]) -> Vec<Message> {
    let mut prompt = vec![Message::system(SYSTEM_INSTRUCTION)];
    let (last, history) = match messages.split_last() {
        Some(split) => split,
        None => return prompt,
    };
    for (i, msg) in history.iter().enumerate() {
        if i == 0 && msg.role != ChatRole::User {
            continue;
        }
        prompt.push(match msg.role {
            ChatRole::User => Message::user(&msg.content),
            ChatRole::Assistant => Message::assistant(&msg.content),
        });
    }
    prompt.push(Message::user(&last.content));
    prompt
}

/// Runs one chat turn: prompt the model with the tool catalog, then
/// either relay its text or execute the single call it chose.
pub async fn process_chat(
    store: &Store,
    provider: Option<&dyn ModelProvider>,
    messages: &[ChatMessage],
) -> AppResult<String> {
    if messages.is_empty() {
        return Err(AppError::Invalid("Messages required".to_string()));
    }
    let provider = provider.ok_or(AppError::ModelUnavailable)?;

    let prompt = build_prompt(messages);
    let declarations = tools::declarations();
    match provider.get_reply(&prompt, &declarations).await? {
        ModelReply::Text(text) => Ok(text),
        ModelReply::ToolCall { name, args } => {
            info!("assistant invoked {name}");
            Ok(tools::dispatch(store, &name, &args).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Role, ToolDeclaration};
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: ModelReply,
        seen: Mutex<Vec<Message>>,
        tools_seen: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(reply: ModelReply) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
                tools_seen: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn get_reply(
            &self,
            messages: &[Message],
            tools: &[ToolDeclaration],
        ) -> Result<ModelReply, AppError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            *self.tools_seen.lock().unwrap() = tools.len();
            Ok(self.reply.clone())
        }
    }

    fn user(content: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::User,
            content: content.to_string(),
        }
    }

    fn assistant(content: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::Assistant,
            content: content.to_string(),
        }
    }

    fn offline_store() -> Store {
        Store::new("http://127.0.0.1:9".to_string(), "unused".to_string())
    }

    #[test]
    fn prompt_drops_a_seeded_greeting() {
        let prompt = build_prompt(&[assistant("Hi! How can I help?"), user("list events")]);

        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[1].role, Role::User);
        assert_eq!(prompt[1].content, "list events");
    }

    #[test]
    fn prompt_keeps_assistant_turns_after_the_first() {
        let prompt = build_prompt(&[
            user("create an event"),
            assistant("What should the title be?"),
            user("Autumn Gala"),
        ]);

        let roles: Vec<Role> = prompt.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(prompt[2].content, "What should the title be?");
        assert_eq!(prompt[3].content, "Autumn Gala");
    }

    #[tokio::test]
    async fn empty_transcripts_are_invalid() {
        let store = offline_store();
        let provider = ScriptedProvider::new(ModelReply::Text("unused".to_string()));

        let err = process_chat(&store, Some(&provider as &dyn ModelProvider), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(msg) if msg == "Messages required"));
    }

    #[tokio::test]
    async fn missing_provider_maps_to_unavailable() {
        let store = offline_store();

        let err = process_chat(&store, None, &[user("hi")]).await.unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable));
    }

    #[tokio::test]
    async fn text_replies_pass_through() {
        let store = offline_store();
        let provider = ScriptedProvider::new(ModelReply::Text("Hello there!".to_string()));

        let reply = process_chat(&store, Some(&provider as &dyn ModelProvider), &[user("hi")])
            .await
            .unwrap();

        assert_eq!(reply, "Hello there!");
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].role, Role::System);
        assert_eq!(seen[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(*provider.tools_seen.lock().unwrap(), 6);
    }

    #[tokio::test]
    async fn tool_calls_are_executed_and_their_text_returned() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/events");
            then.status(200).json_body(json!([]));
        });
        let store = Store::new(server.base_url(), "service-key".to_string());
        let provider = ScriptedProvider::new(ModelReply::ToolCall {
            name: "list_events".to_string(),
            args: json!({"event_type": "upcoming"}),
        });

        let reply = process_chat(
            &store,
            Some(&provider as &dyn ModelProvider),
            &[user("what's coming up?")],
        )
        .await
        .unwrap();

        assert_eq!(reply, "There are no upcoming events.");
    }
}
