use sqlx::PgPool;
use tracing::error;

use crate::errors::AppError;
use crate::models::{MessageType, WidgetMessage};

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Vec<WidgetMessage>, AppError> {
        let rows = sqlx::query(
            "SELECT id, session_id, message_type, content, file_url, is_user, created_at
             FROM widget_messages
             WHERE session_id = $1
             ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch messages for session {session_id}: {e}");
            AppError::db_query(format!("Failed to fetch messages for session {session_id}"), e)
        })?;

        rows.into_iter()
            .map(|row: sqlx::postgres::PgRow| {
                use sqlx::Row;
                let type_str: String = row.try_get("message_type")
                    .map_err(|e| AppError::db_query("Failed to read message_type", e))?;
                let message_type = MessageType::try_from(type_str)
                    .map_err(|e| AppError::Unexpected(format!("Unknown message type: {e}")))?;
                Ok(WidgetMessage {
                    id: row.try_get("id")
                        .map_err(|e| AppError::db_query("Failed to read id", e))?,
                    session_id: row.try_get("session_id")
                        .map_err(|e| AppError::db_query("Failed to read session_id", e))?,
                    message_type,
                    content: row.try_get("content")
                        .map_err(|e| AppError::db_query("Failed to read content", e))?,
                    file_url: row.try_get("file_url")
                        .map_err(|e| AppError::db_query("Failed to read file_url", e))?,
                    is_user: row.try_get("is_user")
                        .map_err(|e| AppError::db_query("Failed to read is_user", e))?,
                    created_at: row.try_get("created_at")
                        .map_err(|e| AppError::db_query("Failed to read created_at", e))?,
                })
            })
            .collect()
    }

    pub async fn save(&self, message: &WidgetMessage) -> Result<WidgetMessage, AppError> {
        sqlx::query(
            "INSERT INTO widget_messages
                 (id, session_id, message_type, content, file_url, is_user, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(message.message_type.as_str())
        .bind(&message.content)
        .bind(&message.file_url)
        .bind(message.is_user)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save message {}: {e}", message.id);
            AppError::db_query("Failed to save message", e)
        })?;
        Ok(message.clone())
    }
}
