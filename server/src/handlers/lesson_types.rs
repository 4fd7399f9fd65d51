use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::pages::{render, NoData};
use crate::{
    db::{models::parse_object_id, LessonType, Store},
    error::{AppError, Result},
    middleware::CurrentUser,
    session::flash,
};

#[derive(Debug, Deserialize)]
pub struct LessonTypeForm {
    pub add_lesson_type: String,
}

#[derive(Debug, Serialize)]
pub struct LessonTypeView {
    pub id: String,
    pub lesson_type: String,
}

impl From<LessonType> for LessonTypeView {
    fn from(lesson_type: LessonType) -> Self {
        Self {
            id: lesson_type.id.map(|id| id.to_hex()).unwrap_or_default(),
            lesson_type: lesson_type.lesson_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LessonTypeListView {
    pub lesson_types: Vec<LessonTypeView>,
}

#[derive(Debug, Serialize)]
pub struct LessonTypeEditView {
    pub lesson_type: LessonTypeView,
}

#[get("/manage_lessons")]
pub async fn manage_lessons(
    req: HttpRequest,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let lesson_types = store.list_lesson_types().await?;

    let view = LessonTypeListView {
        lesson_types: lesson_types.into_iter().map(LessonTypeView::from).collect(),
    };

    Ok(render(&req, "manage_lessons", view))
}

#[get("/new_lesson_type")]
pub async fn new_lesson_type_page(req: HttpRequest, _current_user: CurrentUser) -> HttpResponse {
    render(&req, "new_lesson_type", NoData {})
}

#[post("/new_lesson_type")]
pub async fn new_lesson_type(
    current_user: CurrentUser,
    form: web::Form<LessonTypeForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let name = form.into_inner().add_lesson_type;
    let id = store.insert_lesson_type(LessonType::new(name.clone())).await?;

    log::info!(
        "Lesson type '{}' ({}) added by {}",
        name,
        id.to_hex(),
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/manage_lessons",
        "New Lesson Type Added",
    ))
}

#[get("/edit_lesson_type/{lesson_type_id}")]
pub async fn edit_lesson_type_page(
    req: HttpRequest,
    _current_user: CurrentUser,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson type")?;

    let lesson_type = store
        .find_lesson_type(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Lesson type"))?;

    let view = LessonTypeEditView {
        lesson_type: LessonTypeView::from(lesson_type),
    };

    Ok(render(&req, "edit_lesson_type", view))
}

/// Lessons keep whatever name they were saved with; renames are not propagated.
#[post("/edit_lesson_type/{lesson_type_id}")]
pub async fn edit_lesson_type(
    current_user: CurrentUser,
    path: web::Path<String>,
    form: web::Form<LessonTypeForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson type")?;
    let name = form.into_inner().add_lesson_type;

    if !store.rename_lesson_type(&id, &name).await? {
        return Err(AppError::not_found("Lesson type"));
    }

    log::info!(
        "Lesson type {} renamed to '{}' by {}",
        id.to_hex(),
        name,
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/manage_lessons",
        "Category Successfully Updated",
    ))
}

#[get("/delete_lesson_type/{lesson_type_id}")]
pub async fn delete_lesson_type(
    current_user: CurrentUser,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson type")?;

    if !store.delete_lesson_type(&id).await? {
        return Err(AppError::not_found("Lesson type"));
    }

    log::info!(
        "Lesson type {} deleted by {}",
        id.to_hex(),
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/manage_lessons",
        "Category Successfully Deleted",
    ))
}
