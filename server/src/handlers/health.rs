use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::{db::Store, session::SessionManager};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub active_sessions: usize,
    pub store: String,
}

#[get("/health")]
pub async fn health_check(
    store: web::Data<dyn Store>,
    session_manager: Option<web::Data<SessionManager>>,
) -> HttpResponse {
    let active_sessions = session_manager
        .map(|manager| manager.active_session_count())
        .unwrap_or(0);

    let store_status = match store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            log::warn!("Store ping failed: {}", err);
            "unavailable"
        }
    };

    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        active_sessions,
        store: store_status.to_string(),
    };

    HttpResponse::Ok().json(response)
}
