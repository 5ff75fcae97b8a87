use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Widget {
    pub id: String,
    pub api_key: String,
    pub name: String,
    pub greeting: Option<String>,
    pub theme_color: Option<String>,
    pub system_prompt: Option<String>,
    pub allow_file_upload: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// What the embed endpoint exposes; the API key and prompt stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct PublicWidget {
    pub id: String,
    pub name: String,
    pub greeting: Option<String>,
    pub theme_color: Option<String>,
    pub allow_file_upload: bool,
    pub is_active: bool,
}

impl From<Widget> for PublicWidget {
    fn from(w: Widget) -> Self {
        Self {
            id: w.id,
            name: w.name,
            greeting: w.greeting,
            theme_color: w.theme_color,
            allow_file_upload: w.allow_file_upload,
            is_active: w.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WidgetSession {
    pub id: String,
    pub widget_id: String,
    pub visitor_id: String,
    pub language: String,
    pub referrer_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub last_activity_at: DateTime<Utc>,
}

impl WidgetSession {
    pub fn new(
        widget_id: String,
        visitor_id: String,
        language: String,
        referrer_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            widget_id,
            visitor_id,
            language,
            referrer_url,
            started_at: now,
            ended_at: None,
            last_activity_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        if mime.trim().to_ascii_lowercase().starts_with("image/") {
            MessageType::Image
        } else {
            MessageType::File
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageType {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "file" => Ok(MessageType::File),
            other => Err(format!("Unknown message type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetMessage {
    pub id: String,
    pub session_id: String,
    pub message_type: MessageType,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

impl WidgetMessage {
    pub fn new(
        session_id: String,
        message_type: MessageType,
        content: Option<String>,
        file_url: Option<String>,
        is_user: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            message_type,
            content,
            file_url,
            is_user,
            created_at: Utc::now(),
        }
    }
}

// ── Request bodies & query strings ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmbedQuery {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ActiveSessionQuery {
    pub widget_id: String,
    pub visitor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub widget_id: String,
    pub visitor_id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub referrer_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub session_id: String,
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    #[serde(default = "default_is_user")]
    pub is_user: bool,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

fn default_is_user() -> bool {
    true
}

/// A file received through the multipart upload endpoint.
#[derive(Debug)]
pub struct UploadRequest {
    pub session_id: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageExchange {
    pub user_message: WidgetMessage,
    pub ai_message: Option<WidgetMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadExchange {
    pub user_message: WidgetMessage,
    pub ai_message: Option<WidgetMessage>,
    pub file_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrips_through_db_text() {
        for kind in [MessageType::Text, MessageType::Image, MessageType::File] {
            assert_eq!(MessageType::try_from(kind.to_string()).unwrap(), kind);
        }
        assert!(MessageType::try_from("video".to_string()).is_err());
    }

    #[test]
    fn mime_classification() {
        assert_eq!(MessageType::from_mime("image/webp"), MessageType::Image);
        assert_eq!(MessageType::from_mime("text/plain"), MessageType::File);
    }

    #[test]
    fn exchange_uses_camel_case_keys() {
        let user = WidgetMessage::new("s-1".into(), MessageType::Text, Some("oi".into()), None, true);
        let json = serde_json::to_value(MessageExchange { user_message: user, ai_message: None }).unwrap();
        assert!(json.get("userMessage").is_some());
        assert!(json["aiMessage"].is_null());
        assert_eq!(json["userMessage"]["message_type"], "text");
    }

    #[test]
    fn send_request_defaults_to_visitor_text() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"session_id":"s-1","content":"olá"}"#).unwrap();
        assert_eq!(req.message_type, MessageType::Text);
        assert!(req.is_user);
    }

    #[test]
    fn session_hides_activity_timestamp() {
        let session = WidgetSession::new("w-1".into(), "v-1".into(), "pt-BR".into(), None);
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("last_activity_at").is_none());
        assert!(json["ended_at"].is_null());
        assert!(session.is_active());
    }
}
