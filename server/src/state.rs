use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::Store;
use crate::error::Result;
use crate::handlers;
use crate::middleware::RateLimiter;
use crate::session::{CookieSigner, SessionManager};

/// Everything the handlers share, cloned into each worker's `App`.
#[derive(Clone)]
pub struct AppState {
    pub store: web::Data<dyn Store>,
    pub sessions: web::Data<SessionManager>,
    pub rate_limiter: web::Data<RateLimiter>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: SessionManager, rate_limiter: RateLimiter) -> Self {
        Self {
            store: web::Data::from(store),
            sessions: web::Data::new(sessions),
            rate_limiter: web::Data::new(rate_limiter),
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &AppConfig, secret: &str) -> Result<Self> {
        let signer = CookieSigner::new(secret.as_bytes().to_vec()).map_err(|e| {
            crate::error::AppError::Config(format!("SECRET_KEY rejected: {}", e))
        })?;

        Ok(Self::new(
            store,
            SessionManager::new(signer, config.session_expiry_hours),
            RateLimiter::new(
                config.login_rate_limit,
                Duration::from_secs(config.login_rate_window_secs),
            ),
        ))
    }

    /// Registers shared data and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.store.clone())
            .app_data(self.sessions.clone())
            .app_data(self.rate_limiter.clone())
            .configure(handlers::configure);
    }
}
