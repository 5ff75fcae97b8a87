use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;

use crate::errors::AppError;
use crate::models::WidgetSession;

const SESSION_COLUMNS: &str = "id, widget_id, visitor_id, language, referrer_url, \
                               started_at, ended_at, last_activity_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

/// Outcome of inserting a session under the one-active-session index.
pub enum InsertOutcome {
    Inserted(WidgetSession),
    /// Another request opened a session for the same pair first.
    AlreadyActive,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<WidgetSession>, AppError> {
        sqlx::query_as::<_, WidgetSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM widget_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find session {id}: {e}");
            AppError::db_query(format!("Failed to find session {id}"), e)
        })
    }

    pub async fn find_active(
        &self,
        widget_id: &str,
        visitor_id: &str,
    ) -> Result<Option<WidgetSession>, AppError> {
        sqlx::query_as::<_, WidgetSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM widget_sessions
             WHERE widget_id = $1 AND visitor_id = $2 AND ended_at IS NULL"
        ))
        .bind(widget_id)
        .bind(visitor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find active session for visitor {visitor_id}: {e}");
            AppError::db_query("Failed to find active session", e)
        })
    }

    pub async fn insert(&self, session: &WidgetSession) -> Result<InsertOutcome, AppError> {
        let result = sqlx::query(
            "INSERT INTO widget_sessions
                 (id, widget_id, visitor_id, language, referrer_url, started_at, ended_at, last_activity_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT DO NOTHING",
        )
        .bind(&session.id)
        .bind(&session.widget_id)
        .bind(&session.visitor_id)
        .bind(&session.language)
        .bind(&session.referrer_url)
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save session {}: {e}", session.id);
            AppError::db_query("Failed to save session", e)
        })?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyActive)
        } else {
            Ok(InsertOutcome::Inserted(session.clone()))
        }
    }

    /// Sets `ended_at` if the session is still open. Returns whether a row changed.
    pub async fn end(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE widget_sessions SET ended_at = $1 WHERE id = $2 AND ended_at IS NULL",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to end session {id}: {e}");
            AppError::db_query("Failed to end session", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE widget_sessions SET last_activity_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to update session activity {id}: {e}");
                AppError::db_query("Failed to update session", e)
            })?;
        Ok(())
    }

    /// Ends every open session idle since before `cutoff`. Returns how many were closed.
    pub async fn end_idle(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE widget_sessions SET ended_at = $1
             WHERE ended_at IS NULL AND last_activity_at < $2",
        )
        .bind(Utc::now())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to end idle sessions: {e}");
            AppError::db_query("Failed to end idle sessions", e)
        })?;
        Ok(result.rows_affected())
    }
}
