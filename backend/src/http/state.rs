//! Application state for the HTTP server.

use chrono::Duration;
use std::sync::Arc;

use crate::auth::{AuthService, TokenService};
use crate::config::Settings;
use crate::db::FullRepository;
use crate::realtime::ConnectionManager;
use crate::services::PetEngine;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: PetEngine,
    pub auth: Arc<AuthService>,
    pub hub: Arc<ConnectionManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the engine, auth service and realtime hub over one repository.
    pub fn new(repository: Arc<dyn FullRepository>, settings: Settings) -> Self {
        let hub = Arc::new(ConnectionManager::new(Duration::seconds(
            settings.realtime.heartbeat_timeout_secs,
        )));
        let tokens = TokenService::new(
            &settings.auth.secret_key,
            Duration::minutes(settings.auth.access_token_expire_minutes),
            Duration::days(settings.auth.refresh_token_expire_days),
        );
        let auth = Arc::new(AuthService::new(
            repository.clone(),
            tokens,
            settings.auth.bcrypt_cost,
        ));
        let engine = PetEngine::new(repository, hub.clone(), settings.game.clone());
        Self {
            engine,
            auth,
            hub,
            settings: Arc::new(settings),
        }
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        self.engine.repository()
    }
}
