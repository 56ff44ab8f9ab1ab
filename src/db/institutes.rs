use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::institutes::{Institute, InstituteSummary, NewInstitute, UpdateInstituteRequest};

pub async fn insert_institute(
    conn: &mut PgConnection,
    institute: &NewInstitute,
) -> Result<Institute, AppError> {
    let official_email = institute.official_email.trim().to_lowercase();

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tbl_institutes WHERE official_email = $1)",
    )
    .bind(&official_email)
    .fetch_one(&mut *conn)
    .await?;
    if taken {
        return Err(AppError::conflict(
            "An institute with this official email is already registered",
        ));
    }

    let institute = sqlx::query_as::<_, Institute>(
        r#"
        INSERT INTO tbl_institutes (
            id, name, institute_type, official_email, official_phone, address_line1,
            city, state, pincode, is_affiliated, affiliation_university, website
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(institute.name.trim())
    .bind(institute.institute_type)
    .bind(&official_email)
    .bind(institute.official_phone.trim())
    .bind(institute.address_line1.trim())
    .bind(institute.city.trim())
    .bind(institute.state.trim())
    .bind(institute.pincode.trim())
    .bind(institute.is_affiliated)
    .bind(&institute.affiliation_university)
    .bind(&institute.website)
    .fetch_one(conn)
    .await?;

    Ok(institute)
}

pub async fn get_institute(pool: &PgPool, institute_id: Uuid) -> Result<Institute, AppError> {
    sqlx::query_as::<_, Institute>("SELECT * FROM tbl_institutes WHERE id = $1")
        .bind(institute_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Institute not found"))
}

pub async fn institute_exists(pool: &PgPool, institute_id: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tbl_institutes WHERE id = $1)")
        .bind(institute_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn list_institutes(
    pool: &PgPool,
    name: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<InstituteSummary>, i64), AppError> {
    let institutes = sqlx::query_as::<_, InstituteSummary>(
        r#"
        SELECT id, name, institute_type, city, state
        FROM tbl_institutes
        WHERE ($1::TEXT IS NULL OR name ILIKE $1)
        ORDER BY name
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(name)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tbl_institutes WHERE ($1::TEXT IS NULL OR name ILIKE $1)",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok((institutes, total))
}

pub async fn update_institute(
    pool: &PgPool,
    institute_id: Uuid,
    request: &UpdateInstituteRequest,
) -> Result<Institute, AppError> {
    let institute = sqlx::query_as::<_, Institute>(
        r#"
        UPDATE tbl_institutes
        SET name = COALESCE($2, name),
            official_phone = COALESCE($3, official_phone),
            address_line1 = COALESCE($4, address_line1),
            city = COALESCE($5, city),
            state = COALESCE($6, state),
            pincode = COALESCE($7, pincode),
            is_affiliated = COALESCE($8, is_affiliated),
            affiliation_university = COALESCE($9, affiliation_university),
            website = COALESCE($10, website),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(institute_id)
    .bind(request.name.as_deref().map(str::trim))
    .bind(request.official_phone.as_deref().map(str::trim))
    .bind(request.address_line1.as_deref().map(str::trim))
    .bind(request.city.as_deref().map(str::trim))
    .bind(request.state.as_deref().map(str::trim))
    .bind(request.pincode.as_deref().map(str::trim))
    .bind(request.is_affiliated)
    .bind(&request.affiliation_university)
    .bind(&request.website)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Institute not found"))?;

    Ok(institute)
}
