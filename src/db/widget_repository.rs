use sqlx::PgPool;
use tracing::error;

use crate::errors::AppError;
use crate::models::Widget;

const WIDGET_COLUMNS: &str = "id, api_key, name, greeting, theme_color, system_prompt, \
                              allow_file_upload, is_active, created_at";

#[derive(Clone)]
pub struct WidgetRepository {
    pool: PgPool,
}

impl WidgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Widget>, AppError> {
        sqlx::query_as::<_, Widget>(&format!(
            "SELECT {WIDGET_COLUMNS} FROM widgets WHERE api_key = $1"
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find widget by api key: {e}");
            AppError::db_query("Failed to find widget", e)
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Widget>, AppError> {
        sqlx::query_as::<_, Widget>(&format!("SELECT {WIDGET_COLUMNS} FROM widgets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to find widget {id}: {e}");
                AppError::db_query(format!("Failed to find widget {id}"), e)
            })
    }
}
