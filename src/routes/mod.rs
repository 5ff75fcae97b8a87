pub mod embed_routes;
pub mod message_routes;
pub mod session_routes;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;
use tower_http::trace::TraceLayer;

use crate::service::chat_service::ChatService;
use crate::service::widget_service::WidgetService;
use crate::storage::{UploadStore, UPLOADS_ROUTE};

// Multipart framing and the session_id field on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub widgets: WidgetService,
    pub chat: ChatService,
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState, uploads: &UploadStore) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/embed/widget", get(embed_routes::widget_handler))
        .route("/api/widgets/sessions", post(session_routes::create_session_handler))
        .route("/api/widgets/sessions/active", get(session_routes::active_session_handler))
        .route("/api/widgets/sessions/{id}/end", put(session_routes::end_session_handler))
        .route(
            "/api/widgets-messages",
            get(message_routes::list_messages_handler).post(message_routes::send_message_handler),
        )
        .route(
            "/api/widgets/upload",
            post(message_routes::upload_handler).layer(upload_limit),
        )
        .nest_service(
            UPLOADS_ROUTE,
            SetResponseHeader::overriding(
                ServeDir::new(uploads.root()),
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        )
        // The widget is embedded on third-party sites.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
