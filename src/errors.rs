use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Top-level application error. The `Display` text of every variant is sent to
/// the widget verbatim in the `message` field.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── AI Agent errors ──────────────────────────────────────────────────────
    #[error("Ollama service unavailable at {host}")]
    OllamaUnavailable { host: String },

    #[error("Model '{model_name}' not found in Ollama")]
    ModelNotFound { model_name: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("File exceeds the upload limit of {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("Invalid upload: {message}")]
    InvalidUpload { message: String },

    // ── Widget & session errors ──────────────────────────────────────────────
    #[error("Widget não encontrado")]
    WidgetNotFound,

    #[error("Widget inativo")]
    WidgetInactive,

    #[error("Nenhuma sessão ativa")]
    NoActiveSession,

    #[error("Sessão não encontrada")]
    SessionNotFound { id: String },

    #[error("Sessão encerrada")]
    SessionEnded { id: String },

    #[error("Sessão já encerrada")]
    SessionAlreadyEnded { id: String },

    #[error("Uploads are disabled for this widget")]
    UploadsDisabled,

    // ── System errors ────────────────────────────────────────────────────────
    #[error("File storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::WidgetNotFound | AppError::NoActiveSession | AppError::SessionNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::InvalidUpload { .. }
                | AppError::SessionAlreadyEnded { .. }
        )
    }

    pub fn is_agent_unavailable(&self) -> bool {
        matches!(self, AppError::OllamaUnavailable { .. } | AppError::ModelNotFound { .. })
    }

    /// HTTP status of the error response.
    ///
    /// Agent errors never reach a handler today: `ChatService` stores the visitor
    /// message and answers with a null `aiMessage`. The 503 is reserved for
    /// handlers that surface agent failures directly.
    pub fn status(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.is_agent_unavailable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            match self {
                AppError::SessionEnded { .. } | AppError::WidgetInactive | AppError::UploadsDisabled => {
                    StatusCode::FORBIDDEN
                }
                AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::SessionNotFound { id }
            | AppError::SessionEnded { id }
            | AppError::SessionAlreadyEnded { id } => {
                debug!(session_id = %id, "Session request rejected: {self}");
            }
            _ if status.is_server_error() => error!("Request failed: {self}"),
            _ => {}
        }
        let message = match &self {
            // Internals stay in the log.
            AppError::DatabaseQueryFailed { .. } | AppError::Storage(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
