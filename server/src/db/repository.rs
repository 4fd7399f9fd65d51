use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, Cursor, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize};

use super::models::{Lesson, LessonFields, LessonType, User};
use super::Store;
use crate::error::{AppError, Result};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDbContext {
    db: Database,
}

impl MongoDbContext {
    pub fn new(client: Client, database_name: &str) -> Self {
        Self {
            db: client.database(database_name),
        }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository {
            collection: self.db.collection("users"),
        }
    }

    pub fn lessons(&self) -> LessonRepository {
        LessonRepository {
            collection: self.db.collection("lessons"),
        }
    }

    pub fn lesson_types(&self) -> LessonTypeRepository {
        LessonTypeRepository {
            collection: self.db.collection("lesson_types"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.db
            .collection::<User>("users")
            .create_index(username_index)
            .await?;

        let sort_index = IndexModel::builder()
            .keys(doc! { "datetime_millisec": 1 })
            .build();

        // /search depends on this one
        let text_index = IndexModel::builder()
            .keys(doc! {
                "lesson_type": "text",
                "lesson_date": "text",
                "entry_by": "text",
            })
            .build();

        self.db
            .collection::<Lesson>("lessons")
            .create_indexes([sort_index, text_index])
            .await?;

        let name_index = IndexModel::builder()
            .keys(doc! { "lesson_type": 1 })
            .build();

        self.db
            .collection::<LessonType>("lesson_types")
            .create_index(name_index)
            .await?;

        log::info!("Database indexes created successfully");
        Ok(())
    }
}

async fn collect_all<T>(mut cursor: Cursor<T>) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut items = Vec::new();
    while let Some(item) = cursor.try_next().await? {
        items.push(item);
    }
    Ok(items)
}

fn inserted_object_id(id: mongodb::bson::Bson) -> Result<ObjectId> {
    id.as_object_id()
        .ok_or_else(|| AppError::Internal(format!("unexpected inserted id: {}", id)))
}

#[derive(Clone)]
pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(user)
    }

    pub async fn insert(&self, user: &User) -> Result<ObjectId> {
        match self.collection.insert_one(user).await {
            Ok(result) => inserted_object_id(result.inserted_id),
            Err(err) if is_duplicate_key(&err) => Err(AppError::DuplicateUser),
            Err(err) => Err(err.into()),
        }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[derive(Deserialize)]
struct HoursOnly {
    hours: String,
}

#[derive(Clone)]
pub struct LessonRepository {
    collection: Collection<Lesson>,
}

impl LessonRepository {
    pub async fn find_sorted(&self, filter: Document) -> Result<Vec<Lesson>> {
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "datetime_millisec": 1 })
            .await?;
        collect_all(cursor).await
    }

    pub async fn hours(&self) -> Result<Vec<String>> {
        let cursor = self
            .collection
            .clone_with_type::<HoursOnly>()
            .find(doc! {})
            .projection(doc! { "_id": 0, "hours": 1 })
            .await?;

        let rows = collect_all(cursor).await?;
        Ok(rows.into_iter().map(|row| row.hours).collect())
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Lesson>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn insert(&self, lesson: &Lesson) -> Result<ObjectId> {
        let result = self.collection.insert_one(lesson).await?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn update_fields(&self, id: &ObjectId, fields: &LessonFields) -> Result<bool> {
        let update = doc! {
            "$set": {
                "lesson_date": &fields.lesson_date,
                "lesson_start": &fields.lesson_start,
                "lesson_finish": &fields.lesson_finish,
                "hours": &fields.hours,
                "lesson_type": &fields.lesson_type,
                "mileage": &fields.mileage,
                "expenses": &fields.expenses,
                "entry_by": &fields.entry_by,
                "lesson_expense": fields.lesson_expense,
            }
        };

        let result = self
            .collection
            .update_one(doc! { "_id": id }, update)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[derive(Clone)]
pub struct LessonTypeRepository {
    collection: Collection<LessonType>,
}

impl LessonTypeRepository {
    pub async fn find_all_by_name(&self) -> Result<Vec<LessonType>> {
        let cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "lesson_type": 1 })
            .await?;
        collect_all(cursor).await
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<LessonType>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn insert(&self, lesson_type: &LessonType) -> Result<ObjectId> {
        let result = self.collection.insert_one(lesson_type).await?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn rename(&self, id: &ObjectId, name: &str) -> Result<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": { "lesson_type": name } })
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl Store for MongoDbContext {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.users().find_by_username(username).await
    }

    async fn insert_user(&self, user: User) -> Result<ObjectId> {
        self.users().insert(&user).await
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        self.lessons().find_sorted(doc! {}).await
    }

    async fn lesson_hours(&self) -> Result<Vec<String>> {
        self.lessons().hours().await
    }

    async fn search_lessons(&self, query: &str) -> Result<Vec<Lesson>> {
        self.lessons()
            .find_sorted(doc! { "$text": { "$search": query } })
            .await
    }

    async fn find_lesson(&self, id: &ObjectId) -> Result<Option<Lesson>> {
        self.lessons().find_by_id(id).await
    }

    async fn insert_lesson(&self, lesson: Lesson) -> Result<ObjectId> {
        self.lessons().insert(&lesson).await
    }

    async fn update_lesson(&self, id: &ObjectId, fields: LessonFields) -> Result<bool> {
        self.lessons().update_fields(id, &fields).await
    }

    async fn delete_lesson(&self, id: &ObjectId) -> Result<bool> {
        self.lessons().delete(id).await
    }

    async fn list_lesson_types(&self) -> Result<Vec<LessonType>> {
        self.lesson_types().find_all_by_name().await
    }

    async fn find_lesson_type(&self, id: &ObjectId) -> Result<Option<LessonType>> {
        self.lesson_types().find_by_id(id).await
    }

    async fn insert_lesson_type(&self, lesson_type: LessonType) -> Result<ObjectId> {
        self.lesson_types().insert(&lesson_type).await
    }

    async fn rename_lesson_type(&self, id: &ObjectId, name: &str) -> Result<bool> {
        self.lesson_types().rename(id, name).await
    }

    async fn delete_lesson_type(&self, id: &ObjectId) -> Result<bool> {
        self.lesson_types().delete(id).await
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
