use bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};
use crate::ledger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    /// bcrypt hash, never the plain password.
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

impl User {
    pub fn new(username: &str, password: &str) -> Result<Self> {
        let password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

        Ok(Self {
            id: None,
            username: normalize_username(username),
            password,
            first_name: String::new(),
            last_name: String::new(),
            email_address: String::new(),
            address_line_1: String::new(),
            address_line_2: String::new(),
            address_city: String::new(),
            address_post_code: String::new(),
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        Ok(bcrypt::verify(password, &self.password)?)
    }
}

/// Usernames are stored and looked up lower-cased.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// A username becomes the `/profile/{username}` path segment, so it is limited to
/// ASCII letters, digits and `.`, `_`, `-`, `@`, `+`.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(AppError::validation("username is required"));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+');
    if !username.chars().all(allowed) {
        return Err(AppError::validation(
            "username may only contain letters, digits and . _ - @ +",
        ));
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub lesson_date: String,
    pub lesson_start: String,
    #[serde(default)]
    pub lesson_finish: String,
    pub hours: String,
    #[serde(default)]
    pub lesson_type: String,
    #[serde(default = "no")]
    pub mileage: String,
    #[serde(default = "no")]
    pub expenses: String,
    #[serde(default)]
    pub entry_by: String,
    #[serde(deserialize_with = "decimal_or_string")]
    pub lesson_expense: f64,
    #[serde(default)]
    pub datetime_millisec: f64,
}

fn no() -> String {
    "No".to_string()
}

/// Older records stored `lesson_expense` as a string for the hourly tier.
fn decimal_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(f64),
        Text(String),
    }

    match Stored::deserialize(deserializer)? {
        Stored::Number(value) => Ok(value),
        Stored::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The fields a lesson form submits, already validated and with derived values filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonFields {
    pub lesson_date: String,
    pub lesson_start: String,
    pub lesson_finish: String,
    pub hours: String,
    pub lesson_type: String,
    pub mileage: String,
    pub expenses: String,
    pub entry_by: String,
    pub lesson_expense: f64,
}

impl LessonFields {
    /// Parses `hours` and applies the expense tier.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lesson_date: String,
        lesson_start: String,
        lesson_finish: String,
        hours: String,
        lesson_type: String,
        mileage: bool,
        expenses: bool,
        entry_by: String,
    ) -> Result<Self> {
        let parsed_hours = ledger::parse_hours(&hours)?;

        Ok(Self {
            lesson_date,
            lesson_start,
            lesson_finish,
            hours,
            lesson_type,
            mileage: yes_no(mileage),
            expenses: yes_no(expenses),
            entry_by,
            lesson_expense: ledger::lesson_expense(parsed_hours),
        })
    }
}

fn yes_no(flag: bool) -> String {
    let value = if flag { "Yes" } else { "No" };
    value.to_string()
}

impl Lesson {
    /// Builds a new record; the sort key is fixed here and never recomputed.
    pub fn create(fields: LessonFields) -> Result<Self> {
        let datetime_millisec = ledger::sort_key(&fields.lesson_date, &fields.lesson_start)?;

        Ok(Self {
            id: None,
            lesson_date: fields.lesson_date,
            lesson_start: fields.lesson_start,
            lesson_finish: fields.lesson_finish,
            hours: fields.hours,
            lesson_type: fields.lesson_type,
            mileage: fields.mileage,
            expenses: fields.expenses,
            entry_by: fields.entry_by,
            lesson_expense: fields.lesson_expense,
            datetime_millisec,
        })
    }

    /// Overwrites every form-owned field, leaving `_id` and the sort key untouched.
    pub fn apply(&mut self, fields: LessonFields) {
        self.lesson_date = fields.lesson_date;
        self.lesson_start = fields.lesson_start;
        self.lesson_finish = fields.lesson_finish;
        self.hours = fields.hours;
        self.lesson_type = fields.lesson_type;
        self.mileage = fields.mileage;
        self.expenses = fields.expenses;
        self.entry_by = fields.entry_by;
        self.lesson_expense = fields.lesson_expense;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonType {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub lesson_type: String,
}

impl LessonType {
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            lesson_type: name,
        }
    }
}

/// Path ids are ObjectId hex strings; anything else cannot name a stored document.
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::not_found(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn fields(hours: &str) -> LessonFields {
        LessonFields::new(
            "01.01.2024".to_string(),
            "10:00".to_string(),
            "11:00".to_string(),
            hours.to_string(),
            "Motorway".to_string(),
            true,
            false,
            "ann".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_user_new_hashes_and_lowercases() {
        let user = User::new("Ann", "password123").unwrap();
        assert_eq!(user.username, "ann");
        assert_ne!(user.password, "password123");
        assert!(user.id.is_none());
    }

    #[test]
    fn test_verify_password() {
        let user = User::new("ann", "password123").unwrap();
        assert!(user.verify_password("password123").unwrap());
        assert!(!user.verify_password("wrongpassword").unwrap());
    }

    #[test]
    fn test_lesson_fields_derive_expense_and_flags() {
        let short = fields("1.0");
        assert_eq!(short.lesson_expense, 7.2);
        assert_eq!(short.mileage, "Yes");
        assert_eq!(short.expenses, "No");

        let long = fields("2.0");
        assert_eq!(long.lesson_expense, 9.6);
    }

    #[test]
    fn test_lesson_fields_reject_bad_hours() {
        let result = LessonFields::new(
            "01.01.2024".to_string(),
            "10:00".to_string(),
            String::new(),
            "lots".to_string(),
            String::new(),
            false,
            false,
            "ann".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_keeps_sort_key() {
        let mut lesson = Lesson::create(fields("1.0")).unwrap();
        let key = lesson.datetime_millisec;

        let mut changed = fields("2.0");
        changed.lesson_date = "05.06.2025".to_string();
        lesson.apply(changed);

        assert_eq!(lesson.lesson_date, "05.06.2025");
        assert_eq!(lesson.lesson_expense, 9.6);
        assert_eq!(lesson.datetime_millisec, key);
    }

    #[test]
    fn test_lesson_reads_legacy_string_expense() {
        let document = doc! {
            "_id": ObjectId::new(),
            "lesson_date": "01.01.2024",
            "lesson_start": "10:00",
            "lesson_finish": "12:00",
            "hours": "2",
            "lesson_type": "Motorway",
            "mileage": "Yes",
            "expenses": "No",
            "entry_by": "ann",
            "lesson_expense": "9.6",
            "datetime_millisec": 1_704_103_200.0,
        };

        let lesson: Lesson = bson::from_document(document).unwrap();
        assert_eq!(lesson.lesson_expense, 9.6);
        assert_eq!(lesson.datetime_millisec, 1_704_103_200.0);
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ann").is_ok());
        assert!(validate_username("ann.smith-2@school+1").is_ok());

        for bad in ["", "ann\u{1}x", "ann smith", "ann/admin", "josé", "ann?x"] {
            assert!(
                matches!(validate_username(bad), Err(AppError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "Lesson").unwrap(), id);
        assert!(parse_object_id("not-an-id", "Lesson").is_err());
    }
}
