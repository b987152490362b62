//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Documents have no fixed routes; every path goes through the fallback.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new();

    // Shadows a document named "metrics", hence opt-in
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .fallback(handlers::serve_document)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
