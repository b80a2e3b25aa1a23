//! Administrative HTTP API over a circle-management engine
//!
//! ```text
//! http (axum handlers) -> service (workflows) -> session (scoped privilege)
//!                                  |                     |
//!                                  v                     v
//!                               format              engine (traits + in-memory)
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod session;

pub use config::{Config, ConfigError};
pub use engine::{CircleEngine, CircleStore, EngineError, InMemoryEngine};
pub use error::{AdminError, AdminResult};
pub use http::{build_router, AdminServer, AppState};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
pub use service::CirclesAdminService;
pub use session::{SessionContext, SessionManager};
