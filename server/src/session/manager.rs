use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::signing::{now_ms, CookieSigner, SessionClaims};
use crate::error::{AppError, Result};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct SessionData {
    pub session_id: String,
    pub username: String,
    pub expires_at: Instant,
    pub expires_at_ms: u64,
}

impl SessionData {
    pub fn new(username: String, expiry: Duration) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            username,
            expires_at: Instant::now() + expiry,
            expires_at_ms: now_ms().saturating_add(expiry.as_millis() as u64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn claims(&self) -> SessionClaims {
        SessionClaims {
            session_id: self.session_id.clone(),
            username: self.username.clone(),
            expires_at_ms: self.expires_at_ms,
        }
    }
}

/// Server-side sessions keyed by id, handed to clients as signed cookies.
#[derive(Clone)]
pub struct SessionManager {
    // session_id -> SessionData
    sessions: Arc<DashMap<String, SessionData>>,
    signer: CookieSigner,
    expiry: Duration,
}

impl SessionManager {
    pub fn new(signer: CookieSigner, expiry_hours: u64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            signer,
            expiry: Duration::from_secs(expiry_hours * 3600),
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn create_session(&self, username: &str) -> SessionData {
        let session_data = SessionData::new(username.to_string(), self.expiry);

        self.sessions
            .insert(session_data.session_id.clone(), session_data.clone());

        log::info!(
            "Created session {} for user {}",
            session_data.session_id,
            username
        );

        session_data
    }

    pub fn cookie_value(&self, session: &SessionData) -> Result<String> {
        self.signer
            .issue(&session.claims())
            .map_err(|err| AppError::Internal(format!("Failed to sign session cookie: {err}")))
    }

    /// Maps a cookie value back to its live session.
    pub fn resolve(&self, cookie_value: &str) -> Result<SessionData> {
        let claims = self.signer.verify(cookie_value, now_ms()).map_err(|err| {
            log::debug!("Rejected session cookie: {}", err);
            AppError::InvalidSession
        })?;

        let session = self.validate_session(&claims.session_id)?;
        if session.username != claims.username {
            return Err(AppError::InvalidSession);
        }

        Ok(session)
    }

    pub fn validate_session(&self, session_id: &str) -> Result<SessionData> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(AppError::InvalidSession)?;

        if session.is_expired() {
            drop(session);
            self.invalidate_session(session_id);
            return Err(AppError::InvalidSession);
        }

        Ok(session.clone())
    }

    pub fn invalidate_session(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            log::info!("Invalidated session: {}", session_id);
        }
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut removed = 0;

        self.sessions.retain(|session_id, session| {
            if session.is_expired() {
                log::debug!("Cleaned up expired session: {}", session_id);
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            log::info!("Cleaned up {} expired sessions", removed);
        }

        removed
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}
