use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{faculty, users};
use crate::models::common::BulkReport;
use crate::models::faculty::{
    BulkFacultyRequest, FacultyProfile, FacultyQuery, NewFacultyRequest, UpdateFacultyRequest,
};
use crate::models::pagination::PaginationQuery;

async fn create_one(
    pool: &PgPool,
    institute_id: Uuid,
    request: &NewFacultyRequest,
) -> Result<FacultyProfile, AppError> {
    request.validate()?;

    let mut tx = pool.begin().await?;
    let (_, profile) = faculty::create_faculty(&mut *tx, institute_id, request).await?;
    tx.commit().await?;
    Ok(profile)
}

#[tracing::instrument(name = "Create faculty", skip(pool, auth, request))]
#[post("")]
pub async fn create_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<NewFacultyRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let profile = create_one(&pool, institute_id, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        profile,
        "Faculty created successfully",
    )))
}

#[tracing::instrument(name = "Bulk create faculty", skip(pool, auth, request))]
#[post("/bulk")]
pub async fn bulk_create_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<BulkFacultyRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;

    let mut report = BulkReport::default();
    for (index, row) in request.rows.iter().enumerate() {
        let outcome = create_one(&pool, institute_id, row)
            .await
            .map_err(|e| e.message());
        report.record(index, outcome);
    }

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "bulk faculty import finished"
    );

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Bulk faculty import processed",
    )))
}

#[tracing::instrument(name = "List faculty", skip(pool, auth))]
#[get("")]
pub async fn list_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<FacultyQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let pagination = PaginationQuery::new(query.page, query.per_page);

    let (items, total) = faculty::list_faculty(
        &pool,
        institute_id,
        &query,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Faculty retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "My faculty profile", skip(pool, auth))]
#[get("/me")]
pub async fn my_profile(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let faculty_id = auth.claims.faculty()?;
    let profile = faculty::get_profile(&pool, faculty_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Faculty profile retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get faculty", skip(pool, auth))]
#[get("/{faculty_id}")]
pub async fn get_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let profile = faculty::get_profile(&pool, path.into_inner()).await?;
    if profile.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This faculty member belongs to another institute",
        ));
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Faculty retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update faculty", skip(pool, auth, request))]
#[patch("/{faculty_id}")]
pub async fn update_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<UpdateFacultyRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;

    let profile = faculty::get_profile(&pool, path.into_inner()).await?;
    if profile.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This faculty member belongs to another institute",
        ));
    }

    let mut tx = pool.begin().await?;
    users::update_user_fields(&mut *tx, profile.user_id, &request.user).await?;
    faculty::update_faculty(
        &mut *tx,
        &profile,
        request.employee_code.as_deref(),
        request.designation.as_deref(),
        request.department.as_deref(),
    )
    .await?;
    tx.commit().await?;

    let profile = faculty::get_profile(&pool, profile.id).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Faculty updated successfully",
    )))
}

/// Their type and activity assignments go with them.
#[tracing::instrument(name = "Remove faculty", skip(pool, auth))]
#[delete("/{faculty_id}")]
pub async fn remove_faculty(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let profile = faculty::get_profile(&pool, path.into_inner()).await?;
    if profile.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This faculty member belongs to another institute",
        ));
    }

    users::delete_user(&pool, profile.user_id).await?;

    tracing::info!(faculty_id = %profile.id, "faculty removed");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": profile.id }),
        "Faculty removed successfully",
    )))
}
