use actix_web::{
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
    web, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, Ready};

use crate::error::AppError;
use crate::session::{SessionData, SessionManager, SESSION_COOKIE};

/// Attaches the caller's live session, if the cookie names one, to the request.
///
/// Requests without a valid session pass through anonymously; routes that need a
/// user ask for `CurrentUser`.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let cookie_value = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

    if let Some(cookie_value) = cookie_value {
        match req.app_data::<web::Data<SessionManager>>() {
            Some(session_manager) => match session_manager.resolve(&cookie_value) {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                }
                Err(_) => log::debug!("Ignoring stale session cookie on {}", req.path()),
            },
            None => log::warn!("Session manager not available"),
        }
    }

    next.call(req).await
}

/// The logged-in user; extracting it from an anonymous request answers 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionData);

impl CurrentUser {
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.extensions().get::<SessionData>().cloned();
        ready(session.map(CurrentUser).ok_or(AppError::Unauthorized))
    }
}
