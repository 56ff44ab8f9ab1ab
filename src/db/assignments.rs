use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::activities::Activity;
use crate::models::activity_types::ActivityType;
use crate::models::assignments::{
    ActivityAssignment, ActivityAssignmentDetails, ActivityTypeAssignment, AssignmentDetails,
    FacultyAssignmentCount,
};

/// `None` when the pair is already assigned.
pub async fn insert_assignment(
    pool: &PgPool,
    activity_type_id: Uuid,
    faculty_id: Uuid,
    institute_id: Uuid,
) -> Result<Option<ActivityTypeAssignment>, AppError> {
    let assignment = sqlx::query_as::<_, ActivityTypeAssignment>(
        r#"
        INSERT INTO tbl_activity_type_assignments (id, activity_type_id, faculty_id, institute_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (activity_type_id, faculty_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(activity_type_id)
    .bind(faculty_id)
    .bind(institute_id)
    .fetch_optional(pool)
    .await?;
    Ok(assignment)
}

pub async fn get_assignment(pool: &PgPool, id: Uuid) -> Result<ActivityTypeAssignment, AppError> {
    sqlx::query_as::<_, ActivityTypeAssignment>(
        "SELECT * FROM tbl_activity_type_assignments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Assignment not found"))
}

pub async fn delete_assignment(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM tbl_activity_type_assignments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_assignments(
    pool: &PgPool,
    institute_id: Uuid,
    faculty_id: Option<Uuid>,
    activity_type_id: Option<Uuid>,
) -> Result<Vec<AssignmentDetails>, AppError> {
    let assignments = sqlx::query_as::<_, AssignmentDetails>(
        r#"
        SELECT ata.id, ata.activity_type_id, t.key AS activity_type_key,
               t.name AS activity_type_name, ata.faculty_id, u.name AS faculty_name,
               f.employee_code, ata.created_at
        FROM tbl_activity_type_assignments ata
        JOIN tbl_activity_types t ON t.id = ata.activity_type_id
        JOIN tbl_faculty f ON f.id = ata.faculty_id
        JOIN tbl_users u ON u.id = f.user_id
        WHERE ata.institute_id = $1
          AND ($2::UUID IS NULL OR ata.faculty_id = $2)
          AND ($3::UUID IS NULL OR ata.activity_type_id = $3)
        ORDER BY u.name, t.name
        "#,
    )
    .bind(institute_id)
    .bind(faculty_id)
    .bind(activity_type_id)
    .fetch_all(pool)
    .await?;
    Ok(assignments)
}

pub async fn types_for_faculty(
    pool: &PgPool,
    faculty_id: Uuid,
) -> Result<Vec<ActivityType>, AppError> {
    let types = sqlx::query_as::<_, ActivityType>(
        r#"
        SELECT t.* FROM tbl_activity_types t
        JOIN tbl_activity_type_assignments ata ON ata.activity_type_id = t.id
        WHERE ata.faculty_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;
    Ok(types)
}

/// Whether a faculty member may review an activity. An activity routed to
/// someone belongs to them alone; otherwise types nobody in the institute
/// is assigned to are open to all of its reviewers, and assigned types to
/// their assignees.
pub async fn may_review_activity(
    pool: &PgPool,
    activity: &Activity,
    faculty_id: Uuid,
) -> Result<bool, AppError> {
    let allowed = sqlx::query_scalar(
        r#"
        SELECT CASE
            WHEN EXISTS(SELECT 1 FROM tbl_activity_assignments WHERE activity_id = $1)
            THEN EXISTS(
                SELECT 1 FROM tbl_activity_assignments
                WHERE activity_id = $1 AND faculty_id = $3
            )
            ELSE NOT EXISTS(
                SELECT 1 FROM tbl_activity_type_assignments
                WHERE activity_type_id = $2 AND institute_id = $4
            ) OR EXISTS(
                SELECT 1 FROM tbl_activity_type_assignments
                WHERE activity_type_id = $2 AND faculty_id = $3
            )
        END
        "#,
    )
    .bind(activity.id)
    .bind(activity.activity_type_id)
    .bind(faculty_id)
    .bind(activity.institute_id)
    .fetch_one(pool)
    .await?;
    Ok(allowed)
}

/// `None` when the activity is already routed; look it up to see to whom.
pub async fn insert_activity_assignment(
    pool: &PgPool,
    activity_id: Uuid,
    faculty_id: Uuid,
    institute_id: Uuid,
) -> Result<Option<ActivityAssignment>, AppError> {
    let assignment = sqlx::query_as::<_, ActivityAssignment>(
        r#"
        INSERT INTO tbl_activity_assignments (id, activity_id, faculty_id, institute_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (activity_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(activity_id)
    .bind(faculty_id)
    .bind(institute_id)
    .fetch_optional(pool)
    .await?;
    Ok(assignment)
}

pub async fn activity_assignment(
    pool: &PgPool,
    activity_id: Uuid,
) -> Result<Option<ActivityAssignment>, AppError> {
    let assignment = sqlx::query_as::<_, ActivityAssignment>(
        "SELECT * FROM tbl_activity_assignments WHERE activity_id = $1",
    )
    .bind(activity_id)
    .fetch_optional(pool)
    .await?;
    Ok(assignment)
}

pub async fn reassign_activity(
    pool: &PgPool,
    activity_id: Uuid,
    faculty_id: Uuid,
) -> Result<Option<ActivityAssignment>, AppError> {
    let assignment = sqlx::query_as::<_, ActivityAssignment>(
        r#"
        UPDATE tbl_activity_assignments
        SET faculty_id = $2, updated_at = NOW()
        WHERE activity_id = $1
        RETURNING *
        "#,
    )
    .bind(activity_id)
    .bind(faculty_id)
    .fetch_optional(pool)
    .await?;
    Ok(assignment)
}

pub async fn delete_activity_assignment(pool: &PgPool, activity_id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tbl_activity_assignments WHERE activity_id = $1")
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_activity_assignments(
    pool: &PgPool,
    institute_id: Uuid,
    faculty_id: Option<Uuid>,
    activity_id: Option<Uuid>,
) -> Result<Vec<ActivityAssignmentDetails>, AppError> {
    let assignments = sqlx::query_as::<_, ActivityAssignmentDetails>(
        r#"
        SELECT aa.id, aa.activity_id, a.title AS activity_title, a.status AS activity_status,
               a.student_id, su.name AS student_name, aa.faculty_id, fu.name AS faculty_name,
               f.employee_code, aa.created_at, aa.updated_at
        FROM tbl_activity_assignments aa
        JOIN tbl_activities a ON a.id = aa.activity_id
        JOIN tbl_students s ON s.id = a.student_id
        JOIN tbl_users su ON su.id = s.user_id
        JOIN tbl_faculty f ON f.id = aa.faculty_id
        JOIN tbl_users fu ON fu.id = f.user_id
        WHERE aa.institute_id = $1
          AND ($2::UUID IS NULL OR aa.faculty_id = $2)
          AND ($3::UUID IS NULL OR aa.activity_id = $3)
        ORDER BY aa.created_at DESC
        "#,
    )
    .bind(institute_id)
    .bind(faculty_id)
    .bind(activity_id)
    .fetch_all(pool)
    .await?;
    Ok(assignments)
}

pub async fn activities_for_faculty(
    pool: &PgPool,
    faculty_id: Uuid,
) -> Result<Vec<Activity>, AppError> {
    let activities = sqlx::query_as::<_, Activity>(
        r#"
        SELECT a.* FROM tbl_activities a
        JOIN tbl_activity_assignments aa ON aa.activity_id = a.id
        WHERE aa.faculty_id = $1
        ORDER BY a.created_at DESC
        "#,
    )
    .bind(faculty_id)
    .fetch_all(pool)
    .await?;
    Ok(activities)
}

/// Routed activities per faculty member, busiest first.
pub async fn faculty_assignment_counts(
    pool: &PgPool,
    institute_id: Uuid,
) -> Result<Vec<FacultyAssignmentCount>, AppError> {
    let counts = sqlx::query_as::<_, FacultyAssignmentCount>(
        r#"
        SELECT f.id AS faculty_id, u.name, u.email, f.department, COUNT(*) AS count
        FROM tbl_activity_assignments aa
        JOIN tbl_faculty f ON f.id = aa.faculty_id
        JOIN tbl_users u ON u.id = f.user_id
        WHERE aa.institute_id = $1
        GROUP BY f.id, u.name, u.email, f.department
        ORDER BY count DESC, u.name
        "#,
    )
    .bind(institute_id)
    .fetch_all(pool)
    .await?;
    Ok(counts)
}
