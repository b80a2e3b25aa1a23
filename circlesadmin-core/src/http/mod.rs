//! HTTP surface of the circles admin API
//!
//! Thin axum handlers over [`CirclesAdminService`](crate::service::CirclesAdminService).
//! Every failure is answered with `{ "message": ... }` and the status picked
//! by [`AdminError::status_code`](crate::error::AdminError::status_code).

pub mod api;
pub mod handlers;
pub mod server;
pub mod state;
pub mod types;

pub use api::build_router;
pub use server::AdminServer;
pub use state::AppState;
