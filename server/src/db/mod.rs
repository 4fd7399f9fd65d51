pub mod memory;
pub mod models;
pub mod repository;

use async_trait::async_trait;
use bson::oid::ObjectId;

pub use memory::MemoryStore;
pub use models::{Lesson, LessonFields, LessonType, User};
pub use repository::MongoDbContext;

use crate::error::Result;

/// Persistence used by the request handlers.
///
/// Lessons are always returned ordered by `datetime_millisec` ascending and lesson
/// types by name ascending. Update and delete report whether a document matched.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Fails with `DuplicateUser` when the username is taken.
    async fn insert_user(&self, user: User) -> Result<ObjectId>;

    async fn list_lessons(&self) -> Result<Vec<Lesson>>;

    /// Raw `hours` values of every stored lesson, in no particular order.
    async fn lesson_hours(&self) -> Result<Vec<String>>;

    async fn search_lessons(&self, query: &str) -> Result<Vec<Lesson>>;

    async fn find_lesson(&self, id: &ObjectId) -> Result<Option<Lesson>>;

    async fn insert_lesson(&self, lesson: Lesson) -> Result<ObjectId>;

    /// Replaces the form-owned fields only; `datetime_millisec` is left as created.
    async fn update_lesson(&self, id: &ObjectId, fields: LessonFields) -> Result<bool>;

    async fn delete_lesson(&self, id: &ObjectId) -> Result<bool>;

    async fn list_lesson_types(&self) -> Result<Vec<LessonType>>;

    async fn find_lesson_type(&self, id: &ObjectId) -> Result<Option<LessonType>>;

    async fn insert_lesson_type(&self, lesson_type: LessonType) -> Result<ObjectId>;

    async fn rename_lesson_type(&self, id: &ObjectId, name: &str) -> Result<bool>;

    async fn delete_lesson_type(&self, id: &ObjectId) -> Result<bool>;

    async fn ping(&self) -> Result<()>;
}
