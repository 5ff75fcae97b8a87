use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{ActiveSessionQuery, CreateSessionRequest, WidgetSession};
use crate::routes::AppState;

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub success: bool,
    pub message: &'static str,
}

/// GET `/api/widgets/sessions/active` — 404 when the visitor has no open session
pub async fn active_session_handler(
    State(state): State<AppState>,
    Query(query): Query<ActiveSessionQuery>,
) -> Result<Json<WidgetSession>, AppError> {
    state
        .widgets
        .find_active_session(&query.widget_id, &query.visitor_id)
        .await
        .map(Json)
}

/// POST `/api/widgets/sessions`
pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<WidgetSession>), AppError> {
    let session = state.widgets.create_session(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// PUT `/api/widgets/sessions/{id}/end`
pub async fn end_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EndSessionResponse>, AppError> {
    state.widgets.end_session(&id).await?;
    Ok(Json(EndSessionResponse { success: true, message: "Sessão encerrada com sucesso" }))
}
