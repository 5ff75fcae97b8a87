use async_trait::async_trait;
use url::{Url, form_urlencoded};

use crate::error::ApiError;
use crate::models::{
    ChatMessage, FileUpload, MessageExchange, NewSession, OutgoingMessage, Session,
    UploadExchange, WidgetIdentity,
};

/// The REST surface the widget talks to.
///
/// Futures are not required to be `Send`: the browser implementation runs on
/// the single-threaded event loop.
#[async_trait(?Send)]
pub trait WidgetBackend {
    /// `GET /api/embed/widget?key=`
    async fn fetch_widget(&self, api_key: &str) -> Result<WidgetIdentity, ApiError>;

    /// `GET /api/widgets/sessions/active`. A 404 means "no active session" and maps to `Ok(None)`.
    async fn find_active_session(
        &self,
        widget_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Session>, ApiError>;

    /// `POST /api/widgets/sessions`
    async fn create_session(&self, request: &NewSession) -> Result<Session, ApiError>;

    /// `PUT /api/widgets/sessions/:id/end`
    async fn end_session(&self, session_id: &str) -> Result<(), ApiError>;

    /// `GET /api/widgets-messages?session_id=`
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    /// `POST /api/widgets-messages`
    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageExchange, ApiError>;

    /// `POST /api/widgets/upload` (multipart `session_id` + `file`)
    async fn upload_file(
        &self,
        session_id: &str,
        file: &FileUpload,
    ) -> Result<UploadExchange, ApiError>;
}

/// URL builder for the widget API.
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self { base: base.trim_end_matches('/').to_string() }
    }

    pub fn widget(&self, api_key: &str) -> String {
        format!("{}/api/embed/widget?{}", self.base, query(&[("key", api_key)]))
    }

    pub fn active_session(&self, widget_id: &str, visitor_id: &str) -> String {
        format!(
            "{}/api/widgets/sessions/active?{}",
            self.base,
            query(&[("widget_id", widget_id), ("visitor_id", visitor_id)])
        )
    }

    pub fn sessions(&self) -> String {
        format!("{}/api/widgets/sessions", self.base)
    }

    /// The session id is percent-encoded as a path segment.
    pub fn end_session(&self, session_id: &str) -> String {
        let sessions = self.sessions();
        let Ok(mut url) = Url::parse(&sessions) else {
            return format!("{sessions}/{session_id}/end");
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(session_id).push("end");
        }
        url.into()
    }

    pub fn messages(&self, session_id: &str) -> String {
        format!("{}/api/widgets-messages?{}", self.base, query(&[("session_id", session_id)]))
    }

    pub fn send_message(&self) -> String {
        format!("{}/api/widgets-messages", self.base)
    }

    pub fn upload(&self) -> String {
        format!("{}/api/widgets/upload", self.base)
    }
}

fn query(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_paths_with_encoded_queries() {
        let api = Endpoints::new("https://chat.toledoia.app/");
        assert_eq!(
            api.widget("abc 123"),
            "https://chat.toledoia.app/api/embed/widget?key=abc+123"
        );
        assert_eq!(
            api.active_session("w-1", "v&2"),
            "https://chat.toledoia.app/api/widgets/sessions/active?widget_id=w-1&visitor_id=v%262"
        );
        assert_eq!(api.end_session("s-9"), "https://chat.toledoia.app/api/widgets/sessions/s-9/end");
        assert_eq!(
            api.messages("s-9"),
            "https://chat.toledoia.app/api/widgets-messages?session_id=s-9"
        );
        assert_eq!(api.upload(), "https://chat.toledoia.app/api/widgets/upload");
    }

    #[test]
    fn session_id_is_path_encoded() {
        let api = Endpoints::new("http://localhost:8080");
        assert_eq!(
            api.end_session("a b/c?d"),
            "http://localhost:8080/api/widgets/sessions/a%20b%2Fc%3Fd/end"
        );
    }
}
