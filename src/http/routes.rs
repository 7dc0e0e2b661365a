use super::state::AppState;
use super::ws;
use axum::{http::StatusCode, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
///
/// When `static_dir` is set, files in it (the browser client) are served
/// for every path not matched by a route.
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Voice sessions
        .route("/ws", get(ws::voice_socket));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// GET /health
async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
