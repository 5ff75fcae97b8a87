use axum::extract::{Query, State};
use axum::Json;

use crate::errors::AppError;
use crate::models::{EmbedQuery, PublicWidget};
use crate::routes::AppState;

/// GET `/api/embed/widget?key=` — public widget configuration for the embed loader
pub async fn widget_handler(
    State(state): State<AppState>,
    Query(query): Query<EmbedQuery>,
) -> Result<Json<PublicWidget>, AppError> {
    state.widgets.find_widget_by_key(&query.key).await.map(Json)
}
