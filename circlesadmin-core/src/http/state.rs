//! Shared request state

use crate::config::AdminConfig;
use crate::service::CirclesAdminService;
use axum::http::HeaderMap;
use std::sync::Arc;

/// Server state shared across requests
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CirclesAdminService>,

    /// Administrative identity settings
    pub admin: Arc<AdminConfig>,
}

impl AppState {
    pub fn new(service: Arc<CirclesAdminService>, admin: AdminConfig) -> Self {
        Self { service, admin: Arc::new(admin) }
    }

    /// The administrator issuing a request: the user header when present,
    /// otherwise the configured default
    pub fn requesting_user(&self, headers: &HeaderMap) -> String {
        headers
            .get(self.admin.user_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .unwrap_or(&self.admin.default_user)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use axum::http::HeaderValue;

    fn state() -> AppState {
        let engine = Arc::new(InMemoryEngine::new());
        let service = Arc::new(CirclesAdminService::in_memory(engine, "circlesadmin"));
        AppState::new(service, AdminConfig::default())
    }

    #[test]
    fn test_requesting_user_from_header() {
        let state = state();
        let mut headers = HeaderMap::new();
        headers.insert("x-circlesadmin-user", HeaderValue::from_static("carol"));
        assert_eq!(state.requesting_user(&headers), "carol");
    }

    #[test]
    fn test_requesting_user_falls_back_to_default() {
        let state = state();
        assert_eq!(state.requesting_user(&HeaderMap::new()), "admin");

        let mut headers = HeaderMap::new();
        headers.insert("x-circlesadmin-user", HeaderValue::from_static("  "));
        assert_eq!(state.requesting_user(&headers), "admin");
    }
}
