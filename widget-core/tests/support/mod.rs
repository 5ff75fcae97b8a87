#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use toledoia_widget_core::{
    ApiError, ChatMessage, ClientConfig, FileUpload, MessageExchange, MessageType, NewSession,
    OutgoingMessage, Session, UploadExchange, WidgetBackend, WidgetController, WidgetIdentity,
};

pub const API_KEY: &str = "pk_test_123";
pub const VISITOR: &str = "visitor-1";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub fetch_widget: usize,
    pub find_active: usize,
    pub create: usize,
    pub end: usize,
    pub list: usize,
    pub send: usize,
    pub upload: usize,
}

#[derive(Default)]
struct FakeState {
    widgets: HashMap<String, WidgetIdentity>,
    sessions: Vec<Session>,
    messages: Vec<ChatMessage>,
    next_id: u64,
    calls: Calls,
    fail_next_create: Option<ApiError>,
    fail_next_send: Option<ApiError>,
    omit_upload_url: bool,
    list_gate: Option<Arc<Notify>>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn open_session(&self, session_id: &str) -> Result<(), ApiError> {
        match self.sessions.iter().find(|s| s.id == session_id) {
            Some(s) if s.is_active() => Ok(()),
            Some(_) => Err(ApiError::from_body(403, r#"{"message":"Sessão encerrada"}"#)),
            None => Err(ApiError::from_body(404, r#"{"message":"Sessão não encontrada"}"#)),
        }
    }

    fn message(&mut self, session_id: &str, kind: MessageType, content: &str, file_url: Option<String>, is_user: bool) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id("msg"),
            session_id: session_id.to_string(),
            message_type: kind,
            content: Some(content.to_string()),
            file_url,
            is_user,
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }
}

/// In-memory stand-in for the ToledoIA REST API.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.add_widget(API_KEY, widget("w-1", true));
        backend
    }

    pub fn add_widget(&self, key: &str, widget: WidgetIdentity) {
        self.state.lock().unwrap().widgets.insert(key.to_string(), widget);
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    /// Ends the session on the server side, as the idle reaper would.
    pub fn expire(&self, session_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            session.ended_at = Some(Utc::now());
        }
    }

    pub fn fail_next_create(&self, error: ApiError) {
        self.state.lock().unwrap().fail_next_create = Some(error);
    }

    pub fn fail_next_send(&self, error: ApiError) {
        self.state.lock().unwrap().fail_next_send = Some(error);
    }

    /// Parks the next `list_messages` response until the returned handle is notified.
    pub fn hold_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().list_gate = Some(gate.clone());
        gate
    }

    pub fn omit_upload_url(&self) {
        self.state.lock().unwrap().omit_upload_url = true;
    }

    /// A message written by someone else (another tab, an operator).
    pub fn inject_message(&self, session_id: &str, content: &str) -> ChatMessage {
        self.state
            .lock()
            .unwrap()
            .message(session_id, MessageType::Text, content, None, false)
    }

    pub fn active_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.iter().filter(|s| s.is_active()).count()
    }
}

#[async_trait(?Send)]
impl WidgetBackend for FakeBackend {
    async fn fetch_widget(&self, api_key: &str) -> Result<WidgetIdentity, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_widget += 1;
        state
            .widgets
            .get(api_key)
            .cloned()
            .ok_or_else(|| ApiError::from_body(404, r#"{"message":"Widget não encontrado"}"#))
    }

    async fn find_active_session(&self, widget_id: &str, visitor_id: &str) -> Result<Option<Session>, ApiError> {
        {
            self.state.lock().unwrap().calls.find_active += 1;
        }
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        Ok(state
            .sessions
            .iter()
            .find(|s| s.widget_id == widget_id && s.visitor_id == visitor_id && s.is_active())
            .cloned())
    }

    async fn create_session(&self, request: &NewSession) -> Result<Session, ApiError> {
        {
            self.state.lock().unwrap().calls.create += 1;
        }
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_next_create.take() {
            return Err(error);
        }
        let session = Session {
            id: state.next_id("sess"),
            widget_id: request.widget_id.clone(),
            visitor_id: request.visitor_id.clone(),
            started_at: Utc::now(),
            ended_at: None,
            language: request.language.clone(),
            referrer_url: request.referrer_url.clone(),
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn end_session(&self, session_id: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.end += 1;
        match state.sessions.iter_mut().find(|s| s.id == session_id) {
            Some(s) if s.is_active() => {
                s.ended_at = Some(Utc::now());
                Ok(())
            }
            Some(_) => Err(ApiError::from_body(400, r#"{"message":"Sessão já encerrada"}"#)),
            None => Err(ApiError::from_body(404, r#"{"message":"Sessão não encontrada"}"#)),
        }
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let (result, gate) = {
            let mut state = self.state.lock().unwrap();
            state.calls.list += 1;
            let result = state.open_session(session_id).map(|()| {
                state
                    .messages
                    .iter()
                    .filter(|m| m.session_id == session_id)
                    .cloned()
                    .collect()
            });
            (result, state.list_gate.take())
        };
        // The response is computed before the gate so it reflects the moment of the request.
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageExchange, ApiError> {
        {
            self.state.lock().unwrap().calls.send += 1;
        }
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_next_send.take() {
            return Err(error);
        }
        state.open_session(&message.session_id)?;
        let user_message = state.message(&message.session_id, MessageType::Text, &message.content, None, true);
        let ai_message = state.message(&message.session_id, MessageType::Text, "Resposta automática", None, false);
        Ok(MessageExchange { user_message, ai_message: Some(ai_message) })
    }

    async fn upload_file(&self, session_id: &str, file: &FileUpload) -> Result<UploadExchange, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.upload += 1;
        state.open_session(session_id)?;
        let url = (!state.omit_upload_url).then(|| format!("https://files.toledoia.test/{}", file.file_name));
        let user_message = state.message(session_id, file.message_type(), &file.file_name, url.clone(), true);
        Ok(UploadExchange { user_message, ai_message: None, file_url: url })
    }
}

pub fn widget(id: &str, is_active: bool) -> WidgetIdentity {
    WidgetIdentity {
        id: id.to_string(),
        name: "Suporte ToledoIA".to_string(),
        greeting: Some("Olá! Como posso ajudar?".to_string()),
        theme_color: None,
        allow_file_upload: true,
        is_active,
    }
}

pub fn controller(backend: &Arc<FakeBackend>) -> WidgetController<FakeBackend> {
    WidgetController::new(
        backend.clone(),
        widget("w-1", true),
        VISITOR.to_string(),
        ClientConfig::default(),
    )
}

pub fn image(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
        preview_url: Some(format!("blob:https://site.test/{name}")),
    }
}
