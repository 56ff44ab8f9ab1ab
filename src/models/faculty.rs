use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::users::{Gender, NewUser, UpdateUserFields};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct FacultyProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institute_id: Uuid,
    pub employee_code: String,
    pub designation: String,
    pub department: String,
    pub user_code: String,
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Used for self registration and admin creation alike.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewFacultyRequest {
    #[serde(flatten)]
    #[validate]
    pub user: NewUser,
    #[validate(length(min = 1, max = 40, message = "Employee code is required"))]
    pub employee_code: String,
    #[validate(length(min = 1, max = 80, message = "Designation is required"))]
    pub designation: String,
    #[validate(length(min = 1, max = 80, message = "Department is required"))]
    pub department: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkFacultyRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 rows are accepted"))]
    pub rows: Vec<NewFacultyRequest>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFacultyRequest {
    #[serde(flatten)]
    #[validate]
    pub user: UpdateUserFields,
    #[validate(length(min = 1, max = 40, message = "Employee code is required"))]
    pub employee_code: Option<String>,
    #[validate(length(min = 1, max = 80, message = "Designation is required"))]
    pub designation: Option<String>,
    #[validate(length(min = 1, max = 80, message = "Department is required"))]
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FacultyQuery {
    pub department: Option<String>,
    pub designation: Option<String>,
    pub employee_code: Option<String>,
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
