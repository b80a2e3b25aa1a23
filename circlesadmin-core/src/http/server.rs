//! HTTP server for the admin API

use super::api::build_router;
use super::state::AppState;
use crate::config::Config;
use crate::engine::{EngineResult, InMemoryEngine};
use crate::service::CirclesAdminService;
use anyhow::Result;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Admin API server
pub struct AdminServer {
    router: Router,
    addr: SocketAddr,
}

impl AdminServer {
    /// Create a server around an existing service
    pub fn new(service: Arc<CirclesAdminService>, config: &Config) -> Self {
        let state = AppState::new(service, config.admin.clone());
        Self {
            router: build_router(state, &config.server.base_path),
            addr: config.server.bind_address,
        }
    }

    /// Create a server backed by an in-memory engine seeded from `config`
    pub fn in_memory(config: &Config) -> EngineResult<Self> {
        let engine = Arc::new(seeded_engine(config)?);
        let service = Arc::new(CirclesAdminService::in_memory(engine, config.admin.app_id.clone()));
        Ok(Self::new(service, config))
    }

    /// Override the bind address
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Circles admin API listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Circles admin API stopped");
        Ok(())
    }
}

/// In-memory engine with the configured directory users registered
///
/// The default administrator is registered as well when the seed list does
/// not name it, so owner fallback on create always resolves.
pub fn seeded_engine(config: &Config) -> EngineResult<InMemoryEngine> {
    let default_user = &config.admin.default_user;
    let mut users: Vec<(String, String)> = config
        .engine
        .users
        .iter()
        .map(|user| (user.id.clone(), user.display_name().to_string()))
        .collect();
    if !users.iter().any(|(id, _)| id == default_user) {
        users.push((default_user.clone(), default_user.clone()));
    }

    let count = users.len();
    let engine = InMemoryEngine::with_users(users)?;
    info!(users = count, default_user = %default_user, "Seeded in-memory circle engine");
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedUser;

    #[test]
    fn test_seeded_engine_registers_users() {
        let mut config = Config::default();
        config.engine.users = vec![SeedUser::new("alice", "Alice"), SeedUser::new("bob", "Bob")];

        let engine = Arc::new(seeded_engine(&config).unwrap());
        let service = CirclesAdminService::in_memory(engine, "circlesadmin");
        // One single circle per registered user, the default admin included
        assert_eq!(service.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_seeded_engine_keeps_listed_admin() {
        let mut config = Config::default();
        config.engine.users = vec![SeedUser::new("admin", "Administrator")];

        let engine = Arc::new(seeded_engine(&config).unwrap());
        let service = CirclesAdminService::in_memory(engine, "circlesadmin");
        assert_eq!(service.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_default_config_can_create_without_owner() {
        let config = Config::default();
        let engine = Arc::new(seeded_engine(&config).unwrap());
        let service = CirclesAdminService::in_memory(engine, config.admin.app_id.clone());

        let created = service.create_circle("Ops", &config.admin.default_user, None).unwrap();
        assert_eq!(created.circle.owner.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = AdminServer::in_memory(&Config::default())
            .unwrap()
            .with_addr(SocketAddr::from(([127, 0, 0, 1], 0)));

        server.run(async {}).await.unwrap();
    }
}
