//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Stateless analysis
        .route("/workflows/validate", post(handlers::workflow::validate_workflow))
        .route("/workflows/explain", post(handlers::workflow::explain_workflow))
        .route("/workflows/graph", post(handlers::workflow::workflow_graph))
        .route("/workflows/test", post(handlers::workflow::dry_run_workflow))
        // Debug sessions
        .route(
            "/debug/sessions",
            post(handlers::debug::create_session).get(handlers::debug::list_sessions),
        )
        .route(
            "/debug/sessions/{id}",
            get(handlers::debug::get_session).delete(handlers::debug::delete_session),
        )
        .route("/debug/sessions/{id}/start", post(handlers::debug::start_session))
        .route("/debug/sessions/{id}/step", post(handlers::debug::step_session))
        .route(
            "/debug/sessions/{id}/continue",
            post(handlers::debug::continue_session),
        )
        .route("/debug/sessions/{id}/stop", post(handlers::debug::stop_session))
        .route(
            "/debug/sessions/{id}/breakpoints/{task_id}",
            put(handlers::debug::put_breakpoint).delete(handlers::debug::delete_breakpoint),
        )
        .route("/debug/sessions/{id}/context", put(handlers::debug::put_context))
        .route(
            "/debug/sessions/{id}/mocks/{task_ref}",
            put(handlers::debug::put_mock).delete(handlers::debug::delete_mock),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
