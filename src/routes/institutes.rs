use actix_web::{get, patch, web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::institutes;
use crate::models::institutes::{InstituteQuery, UpdateInstituteRequest};
use crate::models::pagination::PaginationQuery;
use crate::models::students::like_pattern;

/// Public directory used by the registration pickers.
#[tracing::instrument(name = "List institutes", skip(pool))]
#[get("")]
pub async fn list_institutes(
    pool: web::Data<PgPool>,
    query: web::Query<InstituteQuery>,
) -> Result<HttpResponse, AppError> {
    let pagination = PaginationQuery::new(query.page, query.per_page);
    let name = like_pattern(query.name.as_deref());

    let (institutes, total) = institutes::list_institutes(
        &pool,
        name.as_deref(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        institutes,
        "Institutes retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Get institute", skip(pool))]
#[get("/{institute_id}")]
pub async fn get_institute(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute = institutes::get_institute(&pool, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        institute,
        "Institute retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update own institute", skip(pool, auth, request))]
#[patch("/me")]
pub async fn update_my_institute(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<UpdateInstituteRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;

    let current = institutes::get_institute(&pool, institute_id).await?;
    request
        .check_affiliation(&current)
        .map_err(AppError::validation_error)?;

    let institute = institutes::update_institute(&pool, institute_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        institute,
        "Institute updated successfully",
    )))
}
