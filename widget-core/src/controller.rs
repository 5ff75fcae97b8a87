use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};

use crate::backend::WidgetBackend;
use crate::cache::{CachedMessage, MessageCache};
use crate::config::ClientConfig;
use crate::directory::WidgetDirectory;
use crate::error::{ApiError, Notice, WidgetError};
use crate::models::{
    ChatMessage, FileUpload, MessageType, NewSession, OutgoingMessage, Session, WidgetIdentity,
};
use crate::session::{SessionManager, SessionState};

/// Operations that gate their UI control while in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Send,
    Upload,
    CreateSession,
}

/// Outcome of a send or upload that did not fail.
#[derive(Clone, Debug)]
pub enum Delivery {
    Confirmed {
        user_message: ChatMessage,
        ai_message: Option<ChatMessage>,
    },
    /// The session had expired; the message was dropped and a fresh session opened.
    SessionRestarted { session: Session },
}

impl Delivery {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Delivery::Confirmed { .. } => None,
            Delivery::SessionRestarted { .. } => Some(Notice::restarting()),
        }
    }
}

/// Outcome of a message-list refresh.
#[derive(Clone, Debug, PartialEq)]
pub enum Refresh {
    NoSession,
    Synced,
    /// The session changed while the request was in flight; the list was ignored.
    Stale,
    SessionRestarted(Session),
}

/// Owns the widget's conversation state: session reference, message list and busy flags.
pub struct WidgetController<B> {
    backend: Arc<B>,
    widget: WidgetIdentity,
    visitor_id: String,
    config: ClientConfig,
    sessions: SessionManager<B>,
    cache: Mutex<MessageCache>,
    busy: Mutex<HashMap<Operation, usize>>,
}

struct BusyGuard<'a> {
    busy: &'a Mutex<HashMap<Operation, usize>>,
    op: Operation,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = busy.get_mut(&self.op) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                busy.remove(&self.op);
            }
        }
    }
}

impl<B: WidgetBackend> WidgetController<B> {
    pub fn new(
        backend: Arc<B>,
        widget: WidgetIdentity,
        visitor_id: String,
        config: ClientConfig,
    ) -> Self {
        let request = NewSession {
            widget_id: widget.id.clone(),
            visitor_id: visitor_id.clone(),
            language: config.language.clone(),
            referrer_url: config.referrer_url.clone(),
        };
        Self {
            sessions: SessionManager::new(backend.clone(), request),
            backend,
            widget,
            visitor_id,
            config,
            cache: Mutex::new(MessageCache::new()),
            busy: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the widget behind `api_key` and builds a controller for it.
    pub async fn connect(
        backend: Arc<B>,
        directory: &WidgetDirectory,
        api_key: &str,
        visitor_id: String,
        config: ClientConfig,
    ) -> Result<Self, WidgetError> {
        let widget = directory.resolve(backend.as_ref(), api_key).await?;
        Ok(Self::new(backend, widget, visitor_id, config))
    }

    pub fn widget(&self) -> &WidgetIdentity {
        &self.widget
    }

    pub fn visitor_id(&self) -> &str {
        &self.visitor_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.sessions.current()
    }

    /// Snapshot of the visible message list.
    pub fn messages(&self) -> Vec<CachedMessage> {
        self.cache().entries().to_vec()
    }

    pub fn is_busy(&self, op: Operation) -> bool {
        let busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        busy.contains_key(&op)
    }

    fn begin(&self, op: Operation) -> BusyGuard<'_> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        *busy.entry(op).or_insert(0) += 1;
        BusyGuard { busy: &self.busy, op }
    }

    fn cache(&self) -> MutexGuard<'_, MessageCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn ensure_session(&self) -> Result<Session, WidgetError> {
        let _busy = self.begin(Operation::CreateSession);
        self.sessions.ensure_session().await
    }

    /// Opens (or adopts) the session and loads its history.
    pub async fn start(&self) -> Result<Session, WidgetError> {
        let session = self.ensure_session().await?;
        match self.refresh_messages().await? {
            Refresh::SessionRestarted(fresh) => Ok(fresh),
            _ => Ok(session),
        }
    }

    /// Ends the current session, if any. Ending an already-closed session succeeds.
    pub async fn end_session(&self) -> Result<(), WidgetError> {
        let Some(session) = self.sessions.current() else {
            return Ok(());
        };
        self.sessions.end_session(&session.id).await
    }

    pub async fn send_text(&self, content: &str) -> Result<Delivery, WidgetError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WidgetError::validation("content", "message must not be empty"));
        }

        let session = self.ensure_session().await?;
        let _busy = self.begin(Operation::Send);
        let seq = self
            .cache()
            .push_pending(&session.id, MessageType::Text, Some(content.to_string()), None);

        let outgoing = OutgoingMessage {
            session_id: session.id.clone(),
            content: content.to_string(),
            message_type: MessageType::Text,
            is_user: true,
        };

        match self.backend.send_message(&outgoing).await {
            Ok(exchange) => {
                let mut confirmed = vec![exchange.user_message.clone()];
                confirmed.extend(exchange.ai_message.clone());
                self.cache().confirm(seq, confirmed);
                Ok(Delivery::Confirmed {
                    user_message: exchange.user_message,
                    ai_message: exchange.ai_message,
                })
            }
            Err(e) => {
                self.cache().discard(seq);
                self.recover_or_fail(&session, e, "send message").await
            }
        }
    }

    pub async fn upload_file(&self, file: FileUpload) -> Result<Delivery, WidgetError> {
        if file.file_name.trim().is_empty() {
            return Err(WidgetError::validation("file", "no file selected"));
        }
        if file.bytes.is_empty() {
            return Err(WidgetError::validation("file", "file is empty"));
        }
        if !self.widget.allow_file_upload {
            return Err(WidgetError::validation("file", "uploads are disabled for this widget"));
        }

        let message_type = file.message_type();
        let preview_url = match message_type {
            MessageType::Image => file.preview_url.clone(),
            _ => None,
        };

        let session = self.ensure_session().await?;
        let _busy = self.begin(Operation::Upload);
        let seq = self.cache().push_pending(
            &session.id,
            message_type,
            Some(file.file_name.clone()),
            preview_url.clone(),
        );

        match self.backend.upload_file(&session.id, &file).await {
            Ok(exchange) => {
                let mut user_message = exchange.user_message;
                user_message.file_url = exchange
                    .file_url
                    .or(user_message.file_url)
                    .or(preview_url);

                let mut confirmed = vec![user_message.clone()];
                confirmed.extend(exchange.ai_message.clone());
                self.cache().confirm(seq, confirmed);
                Ok(Delivery::Confirmed { user_message, ai_message: exchange.ai_message })
            }
            Err(e) => {
                self.cache().discard(seq);
                self.recover_or_fail(&session, e, "upload file").await
            }
        }
    }

    /// Pulls the authoritative message list for the current session.
    pub async fn refresh_messages(&self) -> Result<Refresh, WidgetError> {
        let Some(session) = self.sessions.current() else {
            return Ok(Refresh::NoSession);
        };

        match self.backend.list_messages(&session.id).await {
            Ok(list) => {
                let still_current = self
                    .sessions
                    .current()
                    .is_some_and(|current| current.id == session.id);
                if !still_current {
                    return Ok(Refresh::Stale);
                }
                self.cache().sync_from_server(list);
                Ok(Refresh::Synced)
            }
            Err(e) if e.is_session_expired() => {
                let fresh = self.restart(&session).await?;
                Ok(Refresh::SessionRestarted(fresh))
            }
            Err(e) => {
                warn!("Failed to refresh messages for session {}: {e}", session.id);
                Err(e.into())
            }
        }
    }

    async fn recover_or_fail(
        &self,
        session: &Session,
        e: ApiError,
        action: &str,
    ) -> Result<Delivery, WidgetError> {
        if e.is_session_expired() {
            let session = self.restart(session).await?;
            return Ok(Delivery::SessionRestarted { session });
        }
        error!("Failed to {action} in session {}: {e}", session.id);
        Err(e.into())
    }

    async fn restart(&self, expired: &Session) -> Result<Session, WidgetError> {
        if self.sessions.expire(&expired.id) {
            self.cache().clear();
        }
        let session = self.ensure_session().await?;
        info!("Restarted conversation: session {} replaces {}", session.id, expired.id);
        Ok(session)
    }
}
