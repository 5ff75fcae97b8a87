use axum::extract::{Multipart, Query, State};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::Json;

use crate::errors::AppError;
use crate::models::{
    MessageExchange, MessagesQuery, SendMessageRequest, UploadExchange, UploadRequest,
    WidgetMessage,
};
use crate::routes::AppState;

const DEFAULT_FILE_NAME: &str = "arquivo";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// GET `/api/widgets-messages?session_id=` — messages in creation order
pub async fn list_messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<WidgetMessage>>, AppError> {
    state.chat.get_messages(&query.session_id).await.map(Json)
}

/// POST `/api/widgets-messages` — 403 `Sessão encerrada` once the session is closed
pub async fn send_message_handler(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageExchange>, AppError> {
    state.chat.send_message(request).await.map(Json)
}

/// POST `/api/widgets/upload` — multipart fields `session_id` and `file`
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadExchange>, AppError> {
    let too_large = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::FileTooLarge { max_bytes: state.max_upload_bytes }
        } else {
            AppError::InvalidUpload { message: e.body_text() }
        }
    };

    let mut session_id = None;
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(too_large)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("session_id") => session_id = Some(field.text().await.map_err(too_large)?),
            Some("file") => {
                let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();
                let content_type = field.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
                let bytes = field.bytes().await.map_err(too_large)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let session_id = session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::EmptyField { field_name: "session_id".to_string() })?;
    let (file_name, content_type, bytes) = file
        .ok_or_else(|| AppError::InvalidUpload { message: "file is missing".to_string() })?;

    state
        .chat
        .upload(UploadRequest { session_id: session_id.trim().to_string(), file_name, content_type, bytes })
        .await
        .map(Json)
}
