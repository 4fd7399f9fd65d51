pub mod auth;
pub mod health;
pub mod lesson_types;
pub mod lessons;
pub mod pages;

use actix_web::{middleware::from_fn, web};

use crate::middleware::rate_limit_middleware;

pub use auth::{login, login_page, logout, profile, register, register_page};
pub use health::health_check;
pub use lesson_types::{
    delete_lesson_type, edit_lesson_type, edit_lesson_type_page, manage_lessons,
    new_lesson_type, new_lesson_type_page,
};
pub use lessons::{
    delete_record, edit_record, edit_record_page, get_lessons, new_record, new_record_page,
    search, search_page,
};
pub use pages::{home, index};

/// Every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(home)
        .service(health_check)
        // Credential submissions are throttled per client
        .service(
            web::resource("/register")
                .wrap(from_fn(rate_limit_middleware))
                .route(web::get().to(register_page))
                .route(web::post().to(register)),
        )
        .service(
            web::resource("/login")
                .wrap(from_fn(rate_limit_middleware))
                .route(web::get().to(login_page))
                .route(web::post().to(login)),
        )
        .service(logout)
        .service(profile)
        .service(get_lessons)
        .service(search_page)
        .service(search)
        .service(new_record_page)
        .service(new_record)
        .service(edit_record_page)
        .service(edit_record)
        .service(delete_record)
        .service(manage_lessons)
        .service(new_lesson_type_page)
        .service(new_lesson_type)
        .service(edit_lesson_type_page)
        .service(edit_lesson_type)
        .service(delete_lesson_type);
}
