use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::academics::AcademicPath;
use crate::models::users::{Gender, NewUser, UpdateUserFields};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institute_id: Uuid,
    pub roll_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student joined with its user identity and current section.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institute_id: Uuid,
    pub roll_number: String,
    pub user_code: String,
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub phone: String,
    pub section_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterStudentRequest {
    #[serde(flatten)]
    #[validate]
    pub user: NewUser,
    #[validate(length(min = 1, max = 40, message = "Roll number is required"))]
    pub roll_number: String,
}

/// Admin-side creation, optionally placing the student in a section.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[serde(flatten)]
    #[validate]
    pub user: NewUser,
    #[validate(length(min = 1, max = 40, message = "Roll number is required"))]
    pub roll_number: String,
    #[validate]
    pub academic: Option<AcademicPath>,
    #[validate(length(max = 60, message = "University id is too long"))]
    pub university_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkStudentsRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 rows are accepted"))]
    pub rows: Vec<CreateStudentRequest>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[serde(flatten)]
    #[validate]
    pub user: UpdateUserFields,
    #[validate(length(min = 1, max = 40, message = "Roll number is required"))]
    pub roll_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    pub gender: Option<Gender>,
    pub roll_number: Option<String>,
    pub section_id: Option<Uuid>,
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl StudentQuery {
    /// `%term%` for ILIKE, ignoring blank filters.
    pub fn name_pattern(&self) -> Option<String> {
        like_pattern(self.name.as_deref())
    }
}

pub fn like_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}
