use actix_web::{get, HttpMessage, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::session::{flash, SessionData};

/// JSON stand-in for a rendered template: page name, session user, pending flash,
/// then the page's own fields.
#[derive(Debug, Serialize)]
struct PageView<'a, T: Serialize> {
    page: &'a str,
    user: Option<String>,
    flash: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Serialize)]
pub struct NoData {}

/// Renders `data` as `page`, consuming any flash message the request carried.
pub fn render<T: Serialize>(req: &HttpRequest, page: &str, data: T) -> HttpResponse {
    let user = req
        .extensions()
        .get::<SessionData>()
        .map(|session| session.username.clone());
    let pending = flash::read_flash(req);

    let mut response = HttpResponse::Ok();
    if pending.is_some() {
        response.cookie(flash::expired_flash_cookie());
    }

    response.json(PageView {
        page,
        user,
        flash: pending,
        data,
    })
}

#[get("/")]
pub async fn index(req: HttpRequest) -> HttpResponse {
    render(&req, "home", NoData {})
}

#[get("/home")]
pub async fn home(req: HttpRequest) -> HttpResponse {
    render(&req, "home", NoData {})
}
