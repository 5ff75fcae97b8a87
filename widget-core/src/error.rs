use serde::Deserialize;
use thiserror::Error;

const SESSION_ENDED: &str = "Sessão encerrada";
const SESSION_NOT_FOUND: &str = "Sessão não encontrada";
const SESSION_ALREADY_ENDED: &str = "Sessão já encerrada";

/// Failure reported by a [`WidgetBackend`](crate::WidgetBackend) call.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status. `message` is the
    /// human-readable text from the error payload, used verbatim in notices.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Parse error: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Builds a status error from a raw response body, preferring the JSON `message` field.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .ok()
            .and_then(|p| p.message.or(p.error))
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("Server error: {status}")
                } else {
                    trimmed.to_string()
                }
            });
        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The backend no longer accepts traffic for the session.
    pub fn is_session_expired(&self) -> bool {
        match self {
            ApiError::Status { status: 403, message } => message.contains(SESSION_ENDED),
            ApiError::Status { status: 404, message } => message.contains(SESSION_NOT_FOUND),
            _ => false,
        }
    }

    /// The session was already closed; ending it again is not a failure.
    pub fn is_already_ended(&self) -> bool {
        matches!(self, ApiError::Status { status: 400, message } if message.contains(SESSION_ALREADY_ENDED))
    }
}

/// Top-level error of the widget client.
#[derive(Debug, Error)]
pub enum WidgetError {
    // ── Validation errors (never reach the network) ─────────────────────────
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    // ── Bootstrap errors ────────────────────────────────────────────────────
    #[error("Widget '{key}' is unavailable")]
    WidgetUnavailable { key: String },

    // ── Backend errors ──────────────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WidgetError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        WidgetError::Validation { field, reason: reason.into() }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, WidgetError::Api(e) if e.is_session_expired())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WidgetError::Validation { .. })
    }

    /// What the notification sink shows for this error.
    pub fn notice(&self) -> Notice {
        if self.is_session_expired() {
            Notice::restarting()
        } else {
            Notice::Error(self.to_string())
        }
    }
}

/// A user-visible notification, the toast of the widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Restarting(String),
}

impl Notice {
    pub fn restarting() -> Self {
        Notice::Restarting("Sua sessão expirou. Reiniciando a conversa…".to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Error(text) | Notice::Restarting(text) => text,
        }
    }
}
