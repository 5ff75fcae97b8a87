use tracing::{error, info, warn};

use crate::agent::WidgetAgentService;
use crate::db::message_repository::MessageRepository;
use crate::errors::AppError;
use crate::models::{
    MessageExchange, MessageType, SendMessageRequest, UploadExchange, UploadRequest, WidgetMessage,
};
use crate::service::widget_service::WidgetService;
use crate::storage::UploadStore;

const MAX_MESSAGE_LENGTH: usize = 8000;
const MAX_FILE_NAME_LENGTH: usize = 255;

const IMAGE_RECEIVED: &str = "Recebemos sua imagem. Um atendente vai analisá-la em breve.";
const FILE_RECEIVED: &str = "Recebemos seu arquivo. Um atendente vai analisá-lo em breve.";

#[derive(Clone)]
pub struct ChatService {
    widgets: WidgetService,
    message_repo: MessageRepository,
    agent: WidgetAgentService,
    uploads: UploadStore,
    max_upload_bytes: usize,
}

impl ChatService {
    pub fn new(
        widgets: WidgetService,
        message_repo: MessageRepository,
        agent: WidgetAgentService,
        uploads: UploadStore,
        max_upload_bytes: usize,
    ) -> Self {
        Self { widgets, message_repo, agent, uploads, max_upload_bytes }
    }

    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<WidgetMessage>, AppError> {
        let session = self.widgets.find_session(session_id).await?;
        self.message_repo.find_by_session_id(&session.id).await
    }

    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<MessageExchange, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        let content = validate_content(&request.content)?;
        let session = self.widgets.require_open(&request.session_id).await?;

        // ── Persist visitor message ───────────────────────────────────────────
        let user_message = WidgetMessage::new(
            session.id.clone(),
            request.message_type,
            Some(content.to_string()),
            None,
            request.is_user,
        );
        self.message_repo.save(&user_message).await?;
        self.widgets.touch(&session.id).await;

        if !request.is_user {
            return Ok(MessageExchange { user_message, ai_message: None });
        }

        // ── History (excludes the just-saved message) ─────────────────────────
        let history: Vec<WidgetMessage> = self
            .message_repo
            .find_by_session_id(&session.id)
            .await?
            .into_iter()
            .filter(|m| m.id != user_message.id)
            .collect();

        // ── AI reply; a failed turn still leaves the visitor message delivered ─
        let widget = self.widgets.widget_for_session(&session).await?;
        let ai_message = match self
            .agent
            .reply(&session.id, widget.system_prompt.as_deref(), &history, content)
            .await
        {
            Ok(reply) => Some(self.message_repo.save(&reply).await?),
            Err(e) if e.is_agent_unavailable() => {
                warn!("Agent unavailable, no AI reply for session {}: {e}", session.id);
                None
            }
            Err(e) => {
                error!("No AI reply for session {}: {e}", session.id);
                None
            }
        };

        Ok(MessageExchange { user_message, ai_message })
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadExchange, AppError> {
        validate_upload(&request, self.max_upload_bytes)?;
        let session = self.widgets.require_open(&request.session_id).await?;
        let widget = self.widgets.widget_for_session(&session).await?;
        if !widget.allow_file_upload {
            return Err(AppError::UploadsDisabled);
        }

        let stored = self
            .uploads
            .save(&session.id, &request.file_name, &request.bytes)
            .await?;
        let message_type = MessageType::from_mime(&request.content_type);
        info!(
            "Session {} uploaded {} ({message_type}, {} bytes)",
            session.id,
            request.file_name,
            request.bytes.len()
        );

        let user_message = WidgetMessage::new(
            session.id.clone(),
            message_type,
            Some(request.file_name.clone()),
            Some(stored.url.clone()),
            true,
        );
        self.message_repo.save(&user_message).await?;

        let acknowledgement = match message_type {
            MessageType::Image => IMAGE_RECEIVED,
            _ => FILE_RECEIVED,
        };
        let ai_message = WidgetMessage::new(
            session.id.clone(),
            MessageType::Text,
            Some(acknowledgement.to_string()),
            None,
            false,
        );
        self.message_repo.save(&ai_message).await?;
        self.widgets.touch(&session.id).await;

        Ok(UploadExchange {
            user_message,
            ai_message: Some(ai_message),
            file_url: Some(stored.url),
        })
    }
}

fn validate_content(content: &str) -> Result<&str, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyField { field_name: "content".to_string() });
    }
    if trimmed.len() > MAX_MESSAGE_LENGTH {
        return Err(AppError::FieldTooLong {
            field_name: "content".to_string(),
            max_length: MAX_MESSAGE_LENGTH,
            actual_length: trimmed.len(),
        });
    }
    Ok(trimmed)
}

fn validate_upload(request: &UploadRequest, max_bytes: usize) -> Result<(), AppError> {
    if request.session_id.trim().is_empty() {
        return Err(AppError::EmptyField { field_name: "session_id".to_string() });
    }
    if request.file_name.trim().is_empty() || request.bytes.is_empty() {
        return Err(AppError::InvalidUpload { message: "file is missing or empty".to_string() });
    }
    if request.file_name.len() > MAX_FILE_NAME_LENGTH {
        return Err(AppError::FieldTooLong {
            field_name: "file".to_string(),
            max_length: MAX_FILE_NAME_LENGTH,
            actual_length: request.file_name.len(),
        });
    }
    if request.bytes.len() > max_bytes {
        return Err(AppError::FileTooLarge { max_bytes });
    }
    Ok(())
}
