use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::error;

use crate::errors::AppError;
use crate::models::{MessageType, WidgetMessage};

const DEFAULT_PREAMBLE: &str = "Você é o assistente virtual da ToledoIA incorporado em um site. \
                                Responda em português, de forma breve, precisa e cordial. \
                                Se não souber algo, diga isso e ofereça encaminhar para um atendente.";

/// Replays stored widget messages as rig chat history. Attachments become a
/// short textual marker since the model only sees text.
fn to_rig_history(messages: &[WidgetMessage]) -> Vec<RigMessage> {
    messages
        .iter()
        .filter_map(|m| {
            let text = match m.message_type {
                MessageType::Text => m.content.clone()?,
                kind => format!("[{kind}: {}]", m.content.as_deref().unwrap_or("anexo")),
            };
            Some(if m.is_user {
                RigMessage::user(&text)
            } else {
                RigMessage::assistant(&text)
            })
        })
        .collect()
}

/// Runs widget chat turns against a local Ollama model through rig.
/// A fresh agent is built per turn so the widget's own prompt and the
/// session history are replayed each time.
#[derive(Clone)]
pub struct WidgetAgentService {
    client: ollama::Client,
    base_url: String,
    model: String,
}

impl WidgetAgentService {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AppError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| AppError::Unexpected(format!("Failed to build Ollama client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    /// Produces the assistant reply to `user_message` for `session_id`.
    pub async fn reply(
        &self,
        session_id: &str,
        system_prompt: Option<&str>,
        history: &[WidgetMessage],
        user_message: &str,
    ) -> Result<WidgetMessage, AppError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_prompt.unwrap_or(DEFAULT_PREAMBLE))
            .build();

        let content = agent
            .chat(user_message, to_rig_history(history))
            .await
            .map_err(|e| {
                error!("Ollama inference failed for session {session_id}: {e}");
                let msg = e.to_string();
                if msg.contains("Connection refused") || msg.contains("connect") {
                    AppError::OllamaUnavailable { host: self.base_url.clone() }
                } else if msg.contains("model") {
                    AppError::ModelNotFound { model_name: self.model.clone() }
                } else {
                    AppError::InferenceError { message: msg }
                }
            })?;

        Ok(WidgetMessage::new(
            session_id.to_string(),
            MessageType::Text,
            Some(content),
            None,
            false,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_text_and_marks_attachments() {
        let messages = vec![
            WidgetMessage::new("s".into(), MessageType::Text, Some("oi".into()), None, true),
            WidgetMessage::new("s".into(), MessageType::Image, Some("foto.png".into()), Some("u".into()), true),
            WidgetMessage::new("s".into(), MessageType::Text, None, None, false),
            WidgetMessage::new("s".into(), MessageType::Text, Some("Olá!".into()), None, false),
        ];
        assert_eq!(to_rig_history(&messages).len(), 3);
    }
}
