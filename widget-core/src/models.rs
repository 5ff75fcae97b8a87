use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public widget configuration returned by `GET /api/embed/widget`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WidgetIdentity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default = "default_true")]
    pub allow_file_upload: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Matches the backend `WidgetSession` model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub widget_id: String,
    pub visitor_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub language: String,
    #[serde(default)]
    pub referrer_url: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Request body for `POST /api/widgets/sessions`.
#[derive(Clone, Debug, Serialize)]
pub struct NewSession {
    pub widget_id: String,
    pub visitor_id: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
}

impl MessageType {
    /// Images get an inline preview; anything else is shown as a generic attachment.
    pub fn classify(mime_type: &str) -> Self {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        if essence.to_ascii_lowercase().starts_with("image/") {
            MessageType::Image
        } else {
            MessageType::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }
}

/// Matches the backend `WidgetMessage` model.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/widgets-messages`.
#[derive(Clone, Debug, Serialize)]
pub struct OutgoingMessage {
    pub session_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub is_user: bool,
}

/// Response of `POST /api/widgets-messages`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageExchange {
    pub user_message: ChatMessage,
    #[serde(default)]
    pub ai_message: Option<ChatMessage>,
}

/// Response of `POST /api/widgets/upload`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadExchange {
    pub user_message: ChatMessage,
    #[serde(default)]
    pub ai_message: Option<ChatMessage>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// A file picked by the visitor, plus the local object URL used for the preview.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub preview_url: Option<String>,
}

impl FileUpload {
    pub fn message_type(&self) -> MessageType {
        MessageType::classify(&self.mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_splits_images_from_other_files() {
        assert_eq!(MessageType::classify("image/png"), MessageType::Image);
        assert_eq!(MessageType::classify("IMAGE/JPEG; q=1"), MessageType::Image);
        assert_eq!(MessageType::classify("application/pdf"), MessageType::File);
        assert_eq!(MessageType::classify(""), MessageType::File);
    }

    #[test]
    fn exchange_reads_camel_case_keys() {
        let body = r#"{
            "userMessage": {
                "id": "m-1", "session_id": "s-1", "message_type": "image",
                "content": "cat.png", "file_url": null, "is_user": true,
                "created_at": "2026-01-01T00:00:00Z"
            },
            "aiMessage": null,
            "fileUrl": "https://cdn.example/cat.png"
        }"#;
        let exchange: UploadExchange = serde_json::from_str(body).unwrap();
        assert_eq!(exchange.user_message.message_type, MessageType::Image);
        assert!(exchange.ai_message.is_none());
        assert_eq!(exchange.file_url.as_deref(), Some("https://cdn.example/cat.png"));
    }

    #[test]
    fn widget_flags_default_to_enabled() {
        let widget: WidgetIdentity =
            serde_json::from_str(r#"{"id":"w-1","name":"Suporte"}"#).unwrap();
        assert!(widget.is_active);
        assert!(widget.allow_file_upload);
        assert!(widget.greeting.is_none());
    }

    #[test]
    fn new_session_omits_missing_referrer() {
        let body = NewSession {
            widget_id: "w-1".into(),
            visitor_id: "v-1".into(),
            language: "pt".into(),
            referrer_url: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("referrer_url").is_none());
        assert_eq!(json["language"], "pt");
    }
}
