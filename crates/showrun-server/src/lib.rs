pub mod broadcaster;
pub mod error;
pub mod routes;
pub mod state;
pub mod watcher;

use axum::routing::{get, post, put};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(root: PathBuf) -> Router {
    let app_state = state::AppState::new(root);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Push channel
        .route("/api/ws", get(routes::ws::ws_upgrade))
        .route("/api/events", get(routes::events::sse_events))
        .route("/api/sync/stats", get(routes::sync::stats))
        .route("/api/health", get(routes::sync::health))
        // Show order
        .route(
            "/api/events/{event_id}/order/{date}",
            get(routes::order::get_lineup),
        )
        .route(
            "/api/events/{event_id}/order/{date}/advance",
            post(routes::order::advance),
        )
        .route(
            "/api/events/{event_id}/order/{date}/retreat",
            post(routes::order::retreat),
        )
        .route(
            "/api/events/{event_id}/order/{date}/items",
            post(routes::order::insert_item),
        )
        .route(
            "/api/events/{event_id}/order/{date}/items/{item_id}",
            axum::routing::delete(routes::order::remove_item),
        )
        .route(
            "/api/events/{event_id}/order/{date}/items/{item_id}/position",
            put(routes::order::move_item),
        )
        .route(
            "/api/events/{event_id}/items/{item_id}/status",
            post(routes::order::set_status),
        )
        .route(
            "/api/events/{event_id}/artists/{artist_id}",
            axum::routing::patch(routes::order::patch_artist),
        )
        .route(
            "/api/events/{event_id}/cues/{cue_id}",
            axum::routing::patch(routes::order::patch_cue),
        )
        // Emergency broadcasts
        .route(
            "/api/events/{event_id}/broadcasts",
            get(routes::broadcasts::list_broadcasts).post(routes::broadcasts::create_broadcast),
        )
        .route(
            "/api/events/{event_id}/broadcasts/{id}",
            get(routes::broadcasts::get_broadcast),
        )
        .route(
            "/api/events/{event_id}/broadcasts/{id}/deactivate",
            post(routes::broadcasts::deactivate_broadcast),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the show server.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the show server on a pre-bound listener.
///
/// The caller can read the actual port before starting (useful when `port = 0`
/// and the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root);

    tracing::info!("showrun server listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
