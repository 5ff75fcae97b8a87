use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::session_repository::{InsertOutcome, SessionRepository};
use crate::db::widget_repository::WidgetRepository;
use crate::errors::AppError;
use crate::models::{CreateSessionRequest, PublicWidget, Widget, WidgetSession};

const DEFAULT_LANGUAGE: &str = "pt-BR";
const MAX_VISITOR_ID_LENGTH: usize = 128;

/// Widget lookup and the session lifecycle.
#[derive(Clone)]
pub struct WidgetService {
    widget_repo: WidgetRepository,
    session_repo: SessionRepository,
    idle_timeout: Duration,
}

impl WidgetService {
    pub fn new(
        widget_repo: WidgetRepository,
        session_repo: SessionRepository,
        idle_timeout: Duration,
    ) -> Self {
        Self { widget_repo, session_repo, idle_timeout }
    }

    pub async fn find_widget_by_key(&self, api_key: &str) -> Result<PublicWidget, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::EmptyField { field_name: "key".to_string() });
        }
        self.widget_repo
            .find_by_api_key(api_key.trim())
            .await?
            .map(PublicWidget::from)
            .ok_or(AppError::WidgetNotFound)
    }

    pub async fn widget_for_session(&self, session: &WidgetSession) -> Result<Widget, AppError> {
        self.widget_repo
            .find_by_id(&session.widget_id)
            .await?
            .ok_or(AppError::WidgetNotFound)
    }

    /// The visitor's open session, or `NoActiveSession`. Idle sessions are closed on the way.
    pub async fn find_active_session(
        &self,
        widget_id: &str,
        visitor_id: &str,
    ) -> Result<WidgetSession, AppError> {
        match self.session_repo.find_active(widget_id, visitor_id).await? {
            Some(session) if self.is_idle(&session, Utc::now()) => {
                self.close_idle(&session).await?;
                Err(AppError::NoActiveSession)
            }
            Some(session) => Ok(session),
            None => Err(AppError::NoActiveSession),
        }
    }

    /// Opens a session for the visitor, or returns the one already open.
    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<WidgetSession, AppError> {
        let visitor_id = request.visitor_id.trim();
        if request.widget_id.trim().is_empty() {
            return Err(AppError::EmptyField { field_name: "widget_id".to_string() });
        }
        if visitor_id.is_empty() {
            return Err(AppError::EmptyField { field_name: "visitor_id".to_string() });
        }
        if visitor_id.len() > MAX_VISITOR_ID_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "visitor_id".to_string(),
                max_length: MAX_VISITOR_ID_LENGTH,
                actual_length: visitor_id.len(),
            });
        }

        let widget = self
            .widget_repo
            .find_by_id(&request.widget_id)
            .await?
            .ok_or(AppError::WidgetNotFound)?;
        if !widget.is_active {
            return Err(AppError::WidgetInactive);
        }

        match self.find_active_session(&widget.id, visitor_id).await {
            Ok(existing) => return Ok(existing),
            Err(AppError::NoActiveSession) => {}
            Err(e) => return Err(e),
        }

        let language = request
            .language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let session = WidgetSession::new(
            widget.id.clone(),
            visitor_id.to_string(),
            language,
            request.referrer_url.filter(|r| !r.trim().is_empty()),
        );

        match self.session_repo.insert(&session).await? {
            InsertOutcome::Inserted(session) => {
                info!("Opened session {} for visitor {} on widget {}", session.id, visitor_id, widget.id);
                Ok(session)
            }
            InsertOutcome::AlreadyActive => {
                // Lost the race against a concurrent create for the same visitor.
                self.session_repo
                    .find_active(&widget.id, visitor_id)
                    .await?
                    .ok_or_else(|| AppError::Unexpected("active session vanished after conflict".to_string()))
            }
        }
    }

    pub async fn end_session(&self, session_id: &str) -> Result<(), AppError> {
        let session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound { id: session_id.to_string() })?;
        if !session.is_active() || !self.session_repo.end(session_id, Utc::now()).await? {
            return Err(AppError::SessionAlreadyEnded { id: session_id.to_string() });
        }
        info!("Ended session {session_id}");
        Ok(())
    }

    pub async fn find_session(&self, session_id: &str) -> Result<WidgetSession, AppError> {
        self.session_repo
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::SessionNotFound { id: session_id.to_string() })
    }

    /// Loads a session that can still take messages.
    pub async fn require_open(&self, session_id: &str) -> Result<WidgetSession, AppError> {
        let session = self.find_session(session_id).await?;
        if !session.is_active() {
            return Err(AppError::SessionEnded { id: session.id });
        }
        if self.is_idle(&session, Utc::now()) {
            self.close_idle(&session).await?;
            return Err(AppError::SessionEnded { id: session.id });
        }
        Ok(session)
    }

    pub async fn touch(&self, session_id: &str) {
        if let Err(e) = self.session_repo.touch(session_id).await {
            warn!("Failed to record activity on session {session_id}: {e}");
        }
    }

    /// Closes every session idle for longer than the configured timeout.
    pub async fn expire_idle_sessions(&self) -> Result<u64, AppError> {
        let Some(cutoff) = Utc::now().checked_sub_signed(idle_span(self.idle_timeout)) else {
            return Ok(0);
        };
        let closed = self.session_repo.end_idle(cutoff).await?;
        if closed > 0 {
            info!("Closed {closed} idle widget session(s)");
        }
        Ok(closed)
    }

    fn is_idle(&self, session: &WidgetSession, now: DateTime<Utc>) -> bool {
        is_idle(session, now, self.idle_timeout)
    }

    async fn close_idle(&self, session: &WidgetSession) -> Result<(), AppError> {
        warn!("Session {} idle since {}; closing", session.id, session.last_activity_at);
        self.session_repo.end(&session.id, Utc::now()).await?;
        Ok(())
    }
}

fn idle_span(timeout: Duration) -> chrono::Duration {
    chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX)
}

fn is_idle(session: &WidgetSession, now: DateTime<Utc>, timeout: Duration) -> bool {
    session.is_active() && now.signed_duration_since(session.last_activity_at) > idle_span(timeout)
}
