use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::activities::ActivityStatus;
use crate::models::common::BulkStatus;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct ActivityTypeAssignment {
    pub id: Uuid,
    pub activity_type_id: Uuid,
    pub faculty_id: Uuid,
    pub institute_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Assignment joined with the names an admin screen shows.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AssignmentDetails {
    pub id: Uuid,
    pub activity_type_id: Uuid,
    pub activity_type_key: String,
    pub activity_type_name: String,
    pub faculty_id: Uuid,
    pub faculty_name: String,
    pub employee_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub activity_type_id: Uuid,
    pub faculty_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkAssignRequest {
    pub faculty_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Between 1 and 200 activity types are accepted"))]
    pub activity_type_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentQuery {
    pub faculty_id: Option<Uuid>,
    pub activity_type_id: Option<Uuid>,
}

text_enum! {
    pub enum AssignOutcome {
        Assigned => "assigned",
        AlreadyAssigned => "already_assigned",
        Failed => "failed",
    }
}

pub trait AssignRow {
    fn outcome(&self) -> AssignOutcome;
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BulkAssignRow {
    pub activity_type_id: Uuid,
    pub outcome: AssignOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssignRow for BulkAssignRow {
    fn outcome(&self) -> AssignOutcome {
        self.outcome
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BulkAssignReport<R = BulkAssignRow> {
    pub status: BulkStatus,
    pub assigned: usize,
    pub already_assigned: usize,
    pub failed: usize,
    pub rows: Vec<R>,
}

impl<R: AssignRow> BulkAssignReport<R> {
    pub fn from_rows(rows: Vec<R>) -> Self {
        let count = |outcome: AssignOutcome| rows.iter().filter(|r| r.outcome() == outcome).count();
        let assigned = count(AssignOutcome::Assigned);
        let already_assigned = count(AssignOutcome::AlreadyAssigned);
        let failed = count(AssignOutcome::Failed);

        Self {
            status: BulkStatus::from_counts(assigned + already_assigned, failed),
            assigned,
            already_assigned,
            failed,
            rows,
        }
    }
}

/// A single activity routed to one reviewing faculty member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct ActivityAssignment {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub faculty_id: Uuid,
    pub institute_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ActivityAssignmentDetails {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub activity_title: String,
    pub activity_status: ActivityStatus,
    pub student_id: Uuid,
    pub student_name: String,
    pub faculty_id: Uuid,
    pub faculty_name: String,
    pub employee_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of both assign and reassign.
#[derive(Debug, Deserialize)]
pub struct AssignActivityRequest {
    pub activity_id: Uuid,
    pub faculty_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkAssignActivitiesRequest {
    pub faculty_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Between 1 and 200 activities are accepted"))]
    pub activity_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityAssignmentQuery {
    pub faculty_id: Option<Uuid>,
    pub activity_id: Option<Uuid>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BulkActivityAssignRow {
    pub activity_id: Uuid,
    pub outcome: AssignOutcome,
    /// Set when the activity was already routed somewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_faculty_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkActivityAssignRow {
    /// An existing assignment to the requested faculty is a no-op; one to
    /// anybody else fails the row and is left untouched.
    pub fn existing(activity_id: Uuid, requested: Uuid, current: Uuid) -> Self {
        let (outcome, error) = if current == requested {
            (AssignOutcome::AlreadyAssigned, None)
        } else {
            (
                AssignOutcome::Failed,
                Some("Activity is already assigned to another faculty member".to_string()),
            )
        };
        Self {
            activity_id,
            outcome,
            current_faculty_id: Some(current),
            error,
        }
    }
}

impl AssignRow for BulkActivityAssignRow {
    fn outcome(&self) -> AssignOutcome {
        self.outcome
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FacultyAssignmentCount {
    pub faculty_id: Uuid,
    pub name: String,
    pub email: String,
    pub department: String,
    pub count: i64,
}
