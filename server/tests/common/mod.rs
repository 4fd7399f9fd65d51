#![allow(dead_code, unused_macros)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use std::sync::Arc;

use lessonlog::db::MemoryStore;
use lessonlog::middleware::RateLimiter;
use lessonlog::session::{CookieSigner, SessionManager};
use lessonlog::state::AppState;

pub const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    test_state_with_limiter(RateLimiter::default())
}

pub fn test_state_with_limiter(rate_limiter: RateLimiter) -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let signer = CookieSigner::new(SECRET.to_vec()).expect("test secret is long enough");
    let state = AppState::new(store.clone(), SessionManager::new(signer, 24), rate_limiter);
    (state, store)
}

pub fn cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Builds the app the way `main` does, minus logging and compression.
macro_rules! init_app {
    ($state:expr) => {{
        let state = $state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .configure(move |cfg| state.configure(cfg))
                .wrap(actix_web::middleware::from_fn(
                    lessonlog::middleware::session_middleware,
                )),
        )
        .await
    }};
}

/// Registers a user and returns the session cookie the response set.
macro_rules! sign_up {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/register")
            .set_form(&[("username", $username), ("password", $password)])
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        common::cookie(&resp, lessonlog::session::SESSION_COOKIE).expect("session cookie")
    }};
}

/// Posts a lesson form as the given session and asserts the redirect.
macro_rules! add_lesson {
    ($app:expr, $session:expr, $form:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/new_record")
            .cookie($session.clone())
            .set_form($form)
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!(common::location(&resp), "/get_lessons");
    }};
}

/// GETs a page and returns its JSON view.
macro_rules! get_json {
    ($app:expr, $uri:expr) => {{
        let req = actix_web::test::TestRequest::get().uri($uri).to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert!(resp.status().is_success(), "GET {} failed: {}", $uri, resp.status());
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        body
    }};
}
