use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::AppError;
use crate::models::activity_types::{
    ActivityType, ActivityTypeStatus, FormField, NewActivityType,
};

pub async fn key_exists(
    pool: &PgPool,
    institute_id: Option<Uuid>,
    key: &str,
) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM tbl_activity_types
            WHERE institute_id IS NOT DISTINCT FROM $1 AND LOWER(key) = LOWER($2)
        )
        "#,
    )
    .bind(institute_id)
    .bind(key)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

#[tracing::instrument(name = "Insert activity type", skip(pool, new_type), fields(key = %new_type.key))]
pub async fn insert_activity_type(
    pool: &PgPool,
    new_type: &NewActivityType,
) -> Result<ActivityType, AppError> {
    if key_exists(pool, new_type.institute_id, &new_type.key).await? {
        return Err(AppError::conflict(format!(
            "Activity type with key \"{}\" already exists",
            new_type.key
        )));
    }

    let activity_type = sqlx::query_as::<_, ActivityType>(
        r#"
        INSERT INTO tbl_activity_types (
            id, institute_id, key, name, description, category, is_primitive, status,
            form_schema, min_credits, max_credits, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new_type.institute_id)
    .bind(&new_type.key)
    .bind(new_type.name.trim())
    .bind(&new_type.description)
    .bind(&new_type.category)
    .bind(new_type.is_primitive)
    .bind(new_type.status)
    .bind(Json(&new_type.form_schema))
    .bind(new_type.min_credits)
    .bind(new_type.max_credits)
    .bind(new_type.created_by)
    .fetch_one(pool)
    .await?;

    Ok(activity_type)
}

pub async fn get_activity_type(pool: &PgPool, id: Uuid) -> Result<ActivityType, AppError> {
    sqlx::query_as::<_, ActivityType>("SELECT * FROM tbl_activity_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Activity type not found"))
}

/// Primitive types plus the institute's own, optionally filtered.
pub async fn list_visible(
    pool: &PgPool,
    institute_id: Uuid,
    category: Option<&str>,
    status: Option<ActivityTypeStatus>,
) -> Result<Vec<ActivityType>, AppError> {
    let types = sqlx::query_as::<_, ActivityType>(
        r#"
        SELECT * FROM tbl_activity_types
        WHERE (is_primitive OR institute_id = $1)
          AND ($2::TEXT IS NULL OR category = $2)
          AND ($3::TEXT IS NULL OR status = $3)
        ORDER BY is_primitive DESC, name
        "#,
    )
    .bind(institute_id)
    .bind(category)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(types)
}

pub async fn list_awaiting_review(
    pool: &PgPool,
    institute_id: Uuid,
) -> Result<Vec<ActivityType>, AppError> {
    let types = sqlx::query_as::<_, ActivityType>(
        r#"
        SELECT * FROM tbl_activity_types
        WHERE institute_id = $1 AND status IN ('SUBMITTED', 'UNDER_REVIEW')
        ORDER BY created_at
        "#,
    )
    .bind(institute_id)
    .fetch_all(pool)
    .await?;

    Ok(types)
}

/// Fields of an update after merging the request over the stored row.
pub struct ActivityTypeChanges<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub status: ActivityTypeStatus,
    pub form_schema: &'a [FormField],
    pub min_credits: i32,
    pub max_credits: i32,
}

pub async fn update_activity_type(
    pool: &PgPool,
    id: Uuid,
    changes: ActivityTypeChanges<'_>,
) -> Result<ActivityType, AppError> {
    let activity_type = sqlx::query_as::<_, ActivityType>(
        r#"
        UPDATE tbl_activity_types
        SET name = $2, description = $3, category = $4, status = $5,
            form_schema = $6, min_credits = $7, max_credits = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.category)
    .bind(changes.status)
    .bind(Json(changes.form_schema))
    .bind(changes.min_credits)
    .bind(changes.max_credits)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Activity type not found"))?;

    Ok(activity_type)
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: ActivityTypeStatus,
) -> Result<ActivityType, AppError> {
    sqlx::query_as::<_, ActivityType>(
        "UPDATE tbl_activity_types SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Activity type not found"))
}

pub async fn count_activities(pool: &PgPool, id: Uuid) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tbl_activities WHERE activity_type_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn delete_activity_type(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM tbl_activity_types WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Activity type not found"));
    }
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct KeyCollision {
    pub institute_id: Option<Uuid>,
    pub normalized_key: String,
    pub occurrences: i64,
}

/// Keys that would collide once lowercased.
pub async fn key_collisions(pool: &PgPool) -> Result<Vec<KeyCollision>, AppError> {
    let collisions = sqlx::query_as::<_, KeyCollision>(
        r#"
        SELECT institute_id, LOWER(TRIM(key)) AS normalized_key, COUNT(*) AS occurrences
        FROM tbl_activity_types
        GROUP BY institute_id, LOWER(TRIM(key))
        HAVING COUNT(*) > 1
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(collisions)
}

pub async fn normalize_keys(pool: &PgPool) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE tbl_activity_types
        SET key = LOWER(TRIM(key)), updated_at = NOW()
        WHERE key <> LOWER(TRIM(key))
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn backfill_institute(pool: &PgPool, institute_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE tbl_activity_types
        SET institute_id = $1, updated_at = NOW()
        WHERE institute_id IS NULL AND NOT is_primitive
        "#,
    )
    .bind(institute_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
