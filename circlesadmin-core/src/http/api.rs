//! API routes definition

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the API router with all endpoints mounted below `base_path`
pub fn build_router(state: AppState, base_path: &str) -> Router {
    let routes = Router::new()
        // Circle routes
        .route("/circles", get(handlers::list_circles).post(handlers::create_circle))
        .route(
            "/circles/:circle_id",
            get(handlers::get_circle)
                .put(handlers::update_circle)
                .delete(handlers::destroy_circle),
        )
        // Member routes
        .route(
            "/circles/:circle_id/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/circles/:circle_id/members/:member_id",
            delete(handlers::remove_member),
        )
        .route(
            "/circles/:circle_id/members/:member_id/level",
            put(handlers::set_member_level),
        );

    let router = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
