use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use std::sync::Arc;

use super::models::{Lesson, LessonFields, LessonType, User};
use super::Store;
use crate::error::{AppError, Result};

/// Process-local store with the same ordering rules as the MongoDB one.
///
/// Search splits the query and the indexed fields (`lesson_type`, `lesson_date`,
/// `entry_by`) into alphanumeric tokens and matches any shared token,
/// case-insensitively. That follows `$text` tokenisation, so `02.01.2024` finds
/// every lesson with a `02`, `01` or `2024` token. `$text` stemming, stop words,
/// `-negation` and quoted phrases are not reproduced.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    lessons: Arc<DashMap<ObjectId, Lesson>>,
    lesson_types: Arc<DashMap<ObjectId, LessonType>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_lessons<F>(&self, keep: F) -> Vec<Lesson>
    where
        F: Fn(&Lesson) -> bool,
    {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        lessons.sort_by(|a, b| {
            a.datetime_millisec
                .total_cmp(&b.datetime_millisec)
                .then_with(|| a.id.cmp(&b.id))
        });
        lessons
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn matches_text(lesson: &Lesson, terms: &[String]) -> bool {
    [&lesson.lesson_type, &lesson.lesson_date, &lesson.entry_by]
        .into_iter()
        .flat_map(|field| words(field))
        .any(|word| terms.contains(&word))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.get(username).map(|user| user.clone()))
    }

    async fn insert_user(&self, mut user: User) -> Result<ObjectId> {
        use dashmap::mapref::entry::Entry;

        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateUser),
            Entry::Vacant(slot) => {
                let id = ObjectId::new();
                user.id = Some(id);
                slot.insert(user);
                Ok(id)
            }
        }
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        Ok(self.sorted_lessons(|_| true))
    }

    async fn lesson_hours(&self) -> Result<Vec<String>> {
        Ok(self
            .lessons
            .iter()
            .map(|entry| entry.value().hours.clone())
            .collect())
    }

    async fn search_lessons(&self, query: &str) -> Result<Vec<Lesson>> {
        let terms: Vec<String> = words(query).collect();
        Ok(self.sorted_lessons(|lesson| matches_text(lesson, &terms)))
    }

    async fn find_lesson(&self, id: &ObjectId) -> Result<Option<Lesson>> {
        Ok(self.lessons.get(id).map(|lesson| lesson.clone()))
    }

    async fn insert_lesson(&self, mut lesson: Lesson) -> Result<ObjectId> {
        let id = ObjectId::new();
        lesson.id = Some(id);
        self.lessons.insert(id, lesson);
        Ok(id)
    }

    async fn update_lesson(&self, id: &ObjectId, fields: LessonFields) -> Result<bool> {
        match self.lessons.get_mut(id) {
            Some(mut lesson) => {
                lesson.apply(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_lesson(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.lessons.remove(id).is_some())
    }

    async fn list_lesson_types(&self) -> Result<Vec<LessonType>> {
        let mut types: Vec<LessonType> = self
            .lesson_types
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        types.sort_by(|a, b| a.lesson_type.cmp(&b.lesson_type));
        Ok(types)
    }

    async fn find_lesson_type(&self, id: &ObjectId) -> Result<Option<LessonType>> {
        Ok(self.lesson_types.get(id).map(|lesson_type| lesson_type.clone()))
    }

    async fn insert_lesson_type(&self, mut lesson_type: LessonType) -> Result<ObjectId> {
        let id = ObjectId::new();
        lesson_type.id = Some(id);
        self.lesson_types.insert(id, lesson_type);
        Ok(id)
    }

    async fn rename_lesson_type(&self, id: &ObjectId, name: &str) -> Result<bool> {
        match self.lesson_types.get_mut(id) {
            Some(mut lesson_type) => {
                lesson_type.lesson_type = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_lesson_type(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.lesson_types.remove(id).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
