use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    get, route, web, HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};

use super::pages::{render, NoData};
use crate::{
    db::{
        models::{normalize_username, validate_username},
        Store, User,
    },
    error::{AppError, Result},
    middleware::CurrentUser,
    session::{
        flash::{self, see_other},
        SessionData, SessionManager, SESSION_COOKIE,
    },
};

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: String,
    #[serde(default)]
    pub address_city: String,
    #[serde(default)]
    pub address_post_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

fn session_cookie(
    session_manager: &SessionManager,
    session: &SessionData,
) -> Result<Cookie<'static>> {
    let value = session_manager.cookie_value(session)?;
    let max_age = Duration::seconds(session_manager.expiry().as_secs() as i64);

    Ok(Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .finish())
}

fn start_session(
    session_manager: &SessionManager,
    username: &str,
    message: &str,
) -> Result<HttpResponse> {
    let session = session_manager.create_session(username);
    let cookie = session_cookie(session_manager, &session)?;

    Ok(see_other(&format!("/profile/{}", username))
        .cookie(cookie)
        .cookie(flash::flash_cookie(message))
        .finish())
}

pub async fn register_page(req: HttpRequest) -> HttpResponse {
    render(&req, "register", NoData {})
}

pub async fn register(
    form: web::Form<RegisterForm>,
    store: web::Data<dyn Store>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let username = normalize_username(&form.username);

    // Reject anything that cannot become a profile path before storing it
    validate_username(&username)?;
    if form.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }

    // Check for an existing account (case-insensitive)
    if store.find_user(&username).await?.is_some() {
        log::info!("Registration refused, username taken: {}", username);
        return Ok(flash::redirect_with_flash(
            "/register",
            &AppError::DuplicateUser.to_string(),
        ));
    }

    // Hash the password and fill in the profile fields
    let mut user = User::new(&username, &form.password)?;
    user.first_name = form.first_name;
    user.last_name = form.last_name;
    user.email_address = form.email_address;
    user.address_line_1 = form.address_line_1;
    user.address_line_2 = form.address_line_2;
    user.address_city = form.address_city;
    user.address_post_code = form.address_post_code;

    // Save user
    match store.insert_user(user).await {
        Ok(_) => {}
        // lost a race with a concurrent registration
        Err(AppError::DuplicateUser) => {
            return Ok(flash::redirect_with_flash(
                "/register",
                &AppError::DuplicateUser.to_string(),
            ));
        }
        Err(err) => return Err(err),
    }

    log::info!("Registered user: {}", username);

    // Log the new user straight in
    start_session(&session_manager, &username, "Registration Successful!")
}

pub async fn login_page(req: HttpRequest) -> HttpResponse {
    render(&req, "login", NoData {})
}

async fn authenticate(store: &dyn Store, username: &str, password: &str) -> Result<User> {
    // Find account by username
    let user = store
        .find_user(username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    if !user.verify_password(password)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

pub async fn login(
    form: web::Form<LoginForm>,
    store: web::Data<dyn Store>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let username = normalize_username(&form.username);
    log::info!("Login attempt for user: {}", username);

    match authenticate(store.get_ref(), &username, &form.password).await {
        Ok(user) => {
            log::info!("Successful login for user: {}", user.username);
            start_session(
                &session_manager,
                &user.username,
                &format!("Welcome, {}", form.username),
            )
        }
        // Unknown user and wrong password read the same to the client
        Err(AppError::InvalidCredentials) => {
            log::warn!("Failed login attempt for user: {}", username);
            Ok(flash::redirect_with_flash(
                "/login",
                &AppError::InvalidCredentials.to_string(),
            ))
        }
        Err(err) => Err(err),
    }
}

#[get("/logout")]
pub async fn logout(
    current_user: Option<CurrentUser>,
    session_manager: web::Data<SessionManager>,
) -> HttpResponse {
    if let Some(CurrentUser(session)) = current_user {
        session_manager.invalidate_session(&session.session_id);
        log::info!("User {} logged out", session.username);
    }

    let cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .max_age(Duration::seconds(0))
        .finish();

    see_other("/login")
        .cookie(cookie)
        .cookie(flash::flash_cookie("You have been logged out"))
        .finish()
}

/// Always shows the session's own user; the path segment is not trusted.
#[route("/profile/{username}", method = "GET", method = "POST")]
pub async fn profile(
    req: HttpRequest,
    path: web::Path<String>,
    current_user: CurrentUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let requested = path.into_inner();
    if requested != current_user.username() {
        log::debug!(
            "Profile for '{}' requested by '{}', showing own profile",
            requested,
            current_user.username()
        );
    }

    let user = store
        .find_user(current_user.username())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let view = ProfileView {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email_address: user.email_address,
    };

    Ok(render(&req, "profile", view))
}
