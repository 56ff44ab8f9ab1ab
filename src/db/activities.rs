use chrono::NaiveDate;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::activities::{
    Activity, ActivityStats, ActivityStatus, Attachment, CreateActivityRequest, ReviewDecision,
    SocialLink,
};

/// Whose activities a query may return.
#[derive(Debug, Clone, Copy)]
pub enum ActivityScope {
    /// Everything the student owns, private ones included.
    Owner { student_id: Uuid },
    /// Public activities of one institute.
    Institute { institute_id: Uuid },
}

impl ActivityScope {
    fn binds(&self) -> (Option<Uuid>, Option<Uuid>) {
        match *self {
            ActivityScope::Owner { student_id } => (Some(student_id), None),
            ActivityScope::Institute { institute_id } => (None, Some(institute_id)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityFilter {
    pub scope: ActivityScope,
    pub status: Option<ActivityStatus>,
    pub activity_type_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

const SCOPE_CLAUSE: &str = r#"
    ($1::UUID IS NULL OR student_id = $1)
    AND ($2::UUID IS NULL OR (institute_id = $2 AND is_public))
    AND ($3::TEXT IS NULL OR status = $3)
    AND ($4::UUID IS NULL OR activity_type_id = $4)
    AND ($5::UUID IS NULL OR student_id = $5)
"#;

#[tracing::instrument(name = "Insert activity", skip(pool, request))]
pub async fn insert_activity(
    pool: &PgPool,
    student_id: Uuid,
    institute_id: Uuid,
    request: &CreateActivityRequest,
) -> Result<Activity, AppError> {
    let activity = sqlx::query_as::<_, Activity>(
        r#"
        INSERT INTO tbl_activities (
            id, student_id, institute_id, activity_type_id, title, description, skills,
            details, is_public, date_start, date_end, attachments, social_links, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(institute_id)
    .bind(request.activity_type_id)
    .bind(request.title.trim())
    .bind(&request.description)
    .bind(&request.skills)
    .bind(Json(&request.details))
    .bind(request.is_public)
    .bind(request.date_start)
    .bind(request.date_end)
    .bind(Json(&request.attachments))
    .bind(Json(&request.social_links))
    .bind(ActivityStatus::Pending)
    .fetch_one(pool)
    .await?;

    Ok(activity)
}

pub async fn get_activity(pool: &PgPool, id: Uuid) -> Result<Activity, AppError> {
    sqlx::query_as::<_, Activity>("SELECT * FROM tbl_activities WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Activity not found"))
}

pub async fn list_activities(
    pool: &PgPool,
    filter: ActivityFilter,
) -> Result<(Vec<Activity>, i64), AppError> {
    let (owner, institute) = filter.scope.binds();

    let list_sql = format!(
        "SELECT * FROM tbl_activities WHERE {SCOPE_CLAUSE} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
    );
    let activities = sqlx::query_as::<_, Activity>(&list_sql)
        .bind(owner)
        .bind(institute)
        .bind(filter.status)
        .bind(filter.activity_type_id)
        .bind(filter.student_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM tbl_activities WHERE {SCOPE_CLAUSE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(owner)
        .bind(institute)
        .bind(filter.status)
        .bind(filter.activity_type_id)
        .bind(filter.student_id)
        .fetch_one(pool)
        .await?;

    Ok((activities, total))
}

/// Activity fields after merging an update over the stored row.
pub struct ActivityChanges<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub skills: &'a [String],
    pub details: &'a Value,
    pub is_public: bool,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub attachments: &'a [Attachment],
    pub social_links: &'a [SocialLink],
}

/// Only touches rows still PENDING; `None` means the activity moved on.
pub async fn update_pending_activity(
    pool: &PgPool,
    id: Uuid,
    changes: ActivityChanges<'_>,
) -> Result<Option<Activity>, AppError> {
    let activity = sqlx::query_as::<_, Activity>(
        r#"
        UPDATE tbl_activities
        SET title = $2, description = $3, skills = $4, details = $5, is_public = $6,
            date_start = $7, date_end = $8, attachments = $9, social_links = $10,
            updated_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.skills)
    .bind(Json(changes.details))
    .bind(changes.is_public)
    .bind(changes.date_start)
    .bind(changes.date_end)
    .bind(Json(changes.attachments))
    .bind(Json(changes.social_links))
    .fetch_optional(pool)
    .await?;

    Ok(activity)
}

pub async fn delete_pending_activity(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tbl_activities WHERE id = $1 AND status = 'PENDING'")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Moves a PENDING activity to its reviewed state. `None` when another
/// reviewer got there first.
#[tracing::instrument(name = "Apply activity review", skip(conn, decision))]
pub async fn apply_review(
    conn: &mut PgConnection,
    id: Uuid,
    reviewer_id: Uuid,
    decision: &ReviewDecision,
) -> Result<Option<Activity>, AppError> {
    let (credits_awarded, credits_earned, remarks, reason) = match decision {
        ReviewDecision::Approve {
            credits_awarded,
            credits_earned,
            remarks,
        } => (*credits_awarded, Some(*credits_earned), remarks.as_deref(), None),
        ReviewDecision::Reject { reason } => (None, None, None, Some(reason.as_str())),
    };

    let activity = sqlx::query_as::<_, Activity>(
        r#"
        UPDATE tbl_activities
        SET status = $2, credits_awarded = $3, credits_earned = $4, approval_remarks = $5,
            rejection_reason = $6, reviewed_by = $7, reviewed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(decision.status())
    .bind(credits_awarded)
    .bind(credits_earned)
    .bind(remarks)
    .bind(reason)
    .bind(reviewer_id)
    .fetch_optional(conn)
    .await?;

    Ok(activity)
}

/// Counts over the same rows `list_activities` would return for the scope.
pub async fn stats(pool: &PgPool, scope: ActivityScope) -> Result<ActivityStats, AppError> {
    let (owner, institute) = scope.binds();

    let stats_sql = format!(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
            COUNT(*) FILTER (WHERE status = 'APPROVED') AS approved,
            COUNT(*) FILTER (WHERE status = 'REJECTED') AS rejected,
            COUNT(*) AS total,
            COALESCE(SUM(credits_earned) FILTER (WHERE status = 'APPROVED'), 0)::BIGINT AS total_credits
        FROM tbl_activities
        WHERE {SCOPE_CLAUSE}
        "#
    );
    let stats = sqlx::query_as::<_, ActivityStats>(&stats_sql)
        .bind(owner)
        .bind(institute)
        .bind(None::<ActivityStatus>)
        .bind(None::<Uuid>)
        .bind(None::<Uuid>)
        .fetch_one(pool)
        .await?;

    Ok(stats)
}

const REVIEW_QUEUE: &str = r#"
    FROM tbl_activities a
    LEFT JOIN tbl_activity_assignments aa ON aa.activity_id = a.id
    WHERE a.institute_id = $2 AND a.status = 'PENDING' AND a.is_public
      AND (
        aa.faculty_id = $1
        OR (aa.id IS NULL AND EXISTS(
            SELECT 1 FROM tbl_activity_type_assignments ata
            WHERE ata.activity_type_id = a.activity_type_id AND ata.faculty_id = $1
        ))
      )
"#;

/// Public PENDING activities routed to the faculty member, either directly
/// or through an assigned type when nobody holds the activity itself.
pub async fn pending_for_faculty(
    pool: &PgPool,
    faculty_id: Uuid,
    institute_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Activity>, i64), AppError> {
    let list_sql = format!("SELECT a.* {REVIEW_QUEUE} ORDER BY a.created_at LIMIT $3 OFFSET $4");
    let activities = sqlx::query_as::<_, Activity>(&list_sql)
        .bind(faculty_id)
        .bind(institute_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) {REVIEW_QUEUE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(faculty_id)
        .bind(institute_id)
        .fetch_one(pool)
        .await?;

    Ok((activities, total))
}
