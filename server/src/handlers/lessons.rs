use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::lesson_types::LessonTypeView;
use super::pages::render;
use crate::{
    db::{models::parse_object_id, Lesson, LessonFields, Store},
    error::{AppError, Result},
    ledger,
    middleware::CurrentUser,
    session::flash,
};

#[derive(Debug, Deserialize)]
pub struct LessonForm {
    pub hours: String,
    /// Checkbox: present means "Yes".
    #[serde(default)]
    pub mileage: Option<String>,
    #[serde(default)]
    pub expenses: Option<String>,
    pub lesson_date: String,
    pub lesson_start: String,
    #[serde(default)]
    pub lesson_finish: String,
    #[serde(default)]
    pub lesson_type: String,
}

fn checked(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl LessonForm {
    pub fn into_fields(self, entry_by: &str) -> Result<LessonFields> {
        let mileage = checked(&self.mileage);
        let expenses = checked(&self.expenses);

        LessonFields::new(
            self.lesson_date,
            self.lesson_start,
            self.lesson_finish,
            self.hours,
            self.lesson_type,
            mileage,
            expenses,
            entry_by.to_string(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LessonView {
    pub id: String,
    pub lesson_date: String,
    pub lesson_start: String,
    pub lesson_finish: String,
    pub hours: String,
    pub lesson_type: String,
    pub mileage: String,
    pub expenses: String,
    pub entry_by: String,
    pub lesson_expense: String,
    pub datetime_millisec: f64,
}

impl From<Lesson> for LessonView {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id.map(|id| id.to_hex()).unwrap_or_default(),
            lesson_date: lesson.lesson_date,
            lesson_start: lesson.lesson_start,
            lesson_finish: lesson.lesson_finish,
            hours: lesson.hours,
            lesson_type: lesson.lesson_type,
            mileage: lesson.mileage,
            expenses: lesson.expenses,
            entry_by: lesson.entry_by,
            lesson_expense: ledger::format_decimal(lesson.lesson_expense),
            datetime_millisec: lesson.datetime_millisec,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LessonListView {
    pub lessons: Vec<LessonView>,
    /// Hours across every stored lesson, not just the ones listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LessonFormView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson: Option<LessonView>,
    pub categories: Vec<LessonTypeView>,
}

fn views(lessons: Vec<Lesson>) -> Vec<LessonView> {
    lessons.into_iter().map(LessonView::from).collect()
}

async fn categories(store: &dyn Store) -> Result<Vec<LessonTypeView>> {
    let types = store.list_lesson_types().await?;
    Ok(types.into_iter().map(LessonTypeView::from).collect())
}

#[get("/get_lessons")]
pub async fn get_lessons(req: HttpRequest, store: web::Data<dyn Store>) -> Result<HttpResponse> {
    let hours = store.lesson_hours().await?;
    let sum = ledger::total_hours(hours.iter().map(String::as_str));

    let lessons = store.list_lessons().await?;

    let view = LessonListView {
        lessons: views(lessons),
        sum: Some(ledger::format_decimal(sum)),
        query: None,
    };

    Ok(render(&req, "lessons", view))
}

/// A blank or missing query lists everything.
async fn run_search(
    req: &HttpRequest,
    store: &dyn Store,
    query: Option<String>,
) -> Result<HttpResponse> {
    let query = query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let lessons = match &query {
        Some(query) => store.search_lessons(query).await?,
        None => store.list_lessons().await?,
    };

    log::debug!("Search {:?} matched {} lessons", query, lessons.len());

    let view = LessonListView {
        lessons: views(lessons),
        sum: None,
        query,
    };

    Ok(render(req, "lessons", view))
}

#[get("/search")]
pub async fn search_page(
    req: HttpRequest,
    form: web::Query<SearchForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    run_search(&req, store.get_ref(), form.into_inner().query).await
}

#[post("/search")]
pub async fn search(
    req: HttpRequest,
    form: web::Form<SearchForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    run_search(&req, store.get_ref(), form.into_inner().query).await
}

#[get("/new_record")]
pub async fn new_record_page(
    req: HttpRequest,
    _current_user: CurrentUser,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let view = LessonFormView {
        lesson: None,
        categories: categories(store.get_ref()).await?,
    };

    Ok(render(&req, "new_record", view))
}

#[post("/new_record")]
pub async fn new_record(
    current_user: CurrentUser,
    form: web::Form<LessonForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    // Parse hours and price the lesson
    let fields = form.into_inner().into_fields(current_user.username())?;

    // Fix the sort key from the lesson's date and start time
    let lesson = Lesson::create(fields)?;

    // Save lesson
    let id = store.insert_lesson(lesson).await?;
    log::info!(
        "Lesson {} added by {}",
        id.to_hex(),
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/get_lessons",
        "Record successfully Added",
    ))
}

#[get("/edit_record/{lesson_id}")]
pub async fn edit_record_page(
    req: HttpRequest,
    _current_user: CurrentUser,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson")?;

    let lesson = store
        .find_lesson(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Lesson"))?;

    let view = LessonFormView {
        lesson: Some(LessonView::from(lesson)),
        categories: categories(store.get_ref()).await?,
    };

    Ok(render(&req, "edit_record", view))
}

/// Rewrites the submitted fields; the lesson keeps its place in the list.
#[post("/edit_record/{lesson_id}")]
pub async fn edit_record(
    current_user: CurrentUser,
    path: web::Path<String>,
    form: web::Form<LessonForm>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson")?;
    let fields = form.into_inner().into_fields(current_user.username())?;

    if !store.update_lesson(&id, fields).await? {
        return Err(AppError::not_found("Lesson"));
    }

    log::info!(
        "Lesson {} updated by {}",
        id.to_hex(),
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/get_lessons",
        "Record successfully Updated",
    ))
}

#[get("/delete_record/{lesson_id}")]
pub async fn delete_record(
    current_user: CurrentUser,
    path: web::Path<String>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse> {
    let id = parse_object_id(&path.into_inner(), "Lesson")?;

    if !store.delete_lesson(&id).await? {
        return Err(AppError::not_found("Lesson"));
    }

    log::info!(
        "Lesson {} deleted by {}",
        id.to_hex(),
        current_user.username()
    );

    Ok(flash::redirect_with_flash(
        "/get_lessons",
        "Record Successfully Deleted",
    ))
}
