pub mod handlers;
pub mod progress;

pub use handlers::ApiError;

use crate::state::AppState;
use crate::utils::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Builds the HTTP surface. Front-end files are served as a fallback when the
/// configured static directory exists.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;
    let static_dir = state.config.server.static_dir.clone();

    let mut router: Router<AppState> = Router::new()
        .route("/upload", post(handlers::upload))
        .route(
            "/translation_progress/{session_id}",
            get(progress::translation_progress),
        )
        .route(
            "/get_session_messages/{session_id}",
            get(handlers::session_messages),
        )
        .route("/preview_excel", post(handlers::preview_excel))
        .route("/download/{filename}", get(handlers::download))
        .route("/history", get(handlers::history))
        .route("/clear_history", post(handlers::clear_history))
        .route("/health", get(handlers::health));

    if static_dir.is_dir() {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("HTTP server listening on http://{}", addr);
    tracing::info!("  POST /upload                          - Start a translation job");
    tracing::info!("  GET  /translation_progress/{{id}}      - Live progress (SSE)");
    tracing::info!("  GET  /get_session_messages/{{id}}      - Progress snapshot");
    tracing::info!("  POST /preview_excel                   - Preview source column");
    tracing::info!("  GET  /download/{{filename}}            - Fetch a translated file");
    tracing::info!("  GET  /history                         - Completed jobs");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
