use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::backend::WidgetBackend;
use crate::error::{ApiError, WidgetError};
use crate::models::{NewSession, Session};

/// Where the widget's session reference stands.
///
/// `Absent -> Creating -> Active -> Ended`; an expired session drops straight
/// back to `Absent` and is recreated on next use.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Absent,
    Creating,
    Active(Session),
    Ended(Session),
}

/// Keeps a single conversation thread per visitor for one widget.
pub struct SessionManager<B> {
    backend: Arc<B>,
    request: NewSession,
    state: Mutex<SessionState>,
    // Held across the whole find-or-create round trip; at most one creation in flight.
    creation: tokio::sync::Mutex<()>,
}

impl<B: WidgetBackend> SessionManager<B> {
    pub fn new(backend: Arc<B>, request: NewSession) -> Self {
        Self {
            backend,
            request,
            state: Mutex::new(SessionState::Absent),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The cached active session, if any.
    pub fn current(&self) -> Option<Session> {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Active(session) => Some(session.clone()),
            _ => None,
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Returns the active session, adopting the server's active one or creating a new one.
    ///
    /// Callers arriving while a creation is in flight wait for it and share its result.
    pub async fn ensure_session(&self) -> Result<Session, WidgetError> {
        if let Some(session) = self.current() {
            return Ok(session);
        }

        let _creating = self.creation.lock().await;
        if let Some(session) = self.current() {
            return Ok(session);
        }

        self.set_state(SessionState::Creating);
        match self.open().await {
            Ok(session) => {
                info!("Widget session {} active for visitor {}", session.id, session.visitor_id);
                self.set_state(SessionState::Active(session.clone()));
                Ok(session)
            }
            Err(e) => {
                error!("Failed to open widget session: {e}");
                self.set_state(SessionState::Absent);
                Err(e.into())
            }
        }
    }

    async fn open(&self) -> Result<Session, ApiError> {
        let existing = self
            .backend
            .find_active_session(&self.request.widget_id, &self.request.visitor_id)
            .await?;
        if let Some(session) = existing.filter(Session::is_active) {
            debug!("Reusing server-side active session {}", session.id);
            return Ok(session);
        }
        self.backend.create_session(&self.request).await
    }

    /// Ends `session_id`. A session the backend already closed counts as ended.
    pub async fn end_session(&self, session_id: &str) -> Result<(), WidgetError> {
        match self.backend.end_session(session_id).await {
            Ok(()) => info!("Widget session {session_id} ended"),
            Err(e) if e.is_already_ended() || e.is_session_expired() => {
                debug!("Widget session {session_id} was already closed: {e}");
            }
            Err(e) => {
                error!("Failed to end widget session {session_id}: {e}");
                return Err(e.into());
            }
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let SessionState::Active(session) = &*state {
            if session.id == session_id {
                let mut ended = session.clone();
                ended.ended_at = Some(Utc::now());
                *state = SessionState::Ended(ended);
            }
        }
        Ok(())
    }

    /// Drops the cached reference after the backend reported `session_id` gone.
    ///
    /// Returns `false` when a different session is already cached.
    pub fn expire(&self, session_id: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            SessionState::Active(session) if session.id == session_id => {
                warn!("Widget session {session_id} expired on the server");
                *state = SessionState::Absent;
                true
            }
            _ => false,
        }
    }
}
