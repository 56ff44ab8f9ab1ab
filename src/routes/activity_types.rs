use actix_web::{delete, get, patch, post, web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{JwtClaims, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::activity_types::{self, ActivityTypeChanges};
use crate::models::activity_types::{
    normalize_category, normalize_key, validate_credits, validate_form_schema, ActivityType,
    ActivityTypeQuery, ActivityTypeStatus, CreateActivityTypeRequest, NewActivityType,
    UpdateActivityTypeRequest,
};
use crate::models::users::Role;

/// Loads a type the caller's institute administers. Primitive types belong
/// to nobody and can't be changed.
async fn administered_type(
    pool: &PgPool,
    claims: &JwtClaims,
    id: Uuid,
) -> Result<ActivityType, AppError> {
    let institute_id = claims.require_admin()?;
    let activity_type = activity_types::get_activity_type(pool, id).await?;

    if activity_type.is_primitive {
        return Err(AppError::forbidden_error(
            "Primitive activity types cannot be modified",
        ));
    }
    if activity_type.institute_id != Some(institute_id) {
        return Err(AppError::forbidden_error(
            "This activity type belongs to another institute",
        ));
    }
    Ok(activity_type)
}

#[tracing::instrument(name = "Create activity type", skip(pool, auth, request))]
#[post("")]
pub async fn create_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateActivityTypeRequest>,
) -> Result<HttpResponse, AppError> {
    let claims = &auth.claims;
    let institute_id = claims.institute()?;
    request.validate()?;

    let is_admin = claims.role == Role::Admin;
    if request.is_primitive && !is_admin {
        return Err(AppError::forbidden_error(
            "Only admins can create primitive activity types",
        ));
    }

    let key = normalize_key(request.key.as_deref(), &request.name)
        .map_err(AppError::validation_error)?;
    validate_credits(request.min_credits, request.max_credits)
        .map_err(AppError::validation_error)?;
    validate_form_schema(&request.form_schema).map_err(AppError::validation_error)?;

    let new_type = NewActivityType {
        institute_id: (!request.is_primitive).then_some(institute_id),
        key,
        name: request.name.trim().to_string(),
        description: request.description.clone(),
        category: normalize_category(request.category.as_deref()),
        is_primitive: request.is_primitive,
        status: if is_admin {
            ActivityTypeStatus::Approved
        } else {
            ActivityTypeStatus::Submitted
        },
        form_schema: request.form_schema.clone(),
        min_credits: request.min_credits,
        max_credits: request.max_credits,
        created_by: auth.user_id,
    };

    let activity_type = activity_types::insert_activity_type(&pool, &new_type).await?;

    let message = if is_admin {
        "Activity type created successfully"
    } else {
        "Activity type submitted for review"
    };
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(activity_type, message)))
}

#[tracing::instrument(name = "List activity types", skip(pool, auth))]
#[get("")]
pub async fn list_activity_types(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ActivityTypeQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let category = query
        .category
        .as_deref()
        .map(|c| normalize_category(Some(c)));
    let status = match auth.claims.role {
        Role::Admin => query.status,
        _ => Some(ActivityTypeStatus::Approved),
    };

    let types =
        activity_types::list_visible(&pool, institute_id, category.as_deref(), status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        types,
        "Activity types retrieved successfully",
    )))
}

#[tracing::instrument(name = "Activity types awaiting review", skip(pool, auth))]
#[get("/pending")]
pub async fn pending_activity_types(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let types = activity_types::list_awaiting_review(&pool, institute_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        types,
        "Pending activity types retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get activity type", skip(pool, auth))]
#[get("/{type_id}")]
pub async fn get_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let activity_type = activity_types::get_activity_type(&pool, path.into_inner()).await?;

    if !activity_type.visible_to(institute_id) {
        return Err(AppError::forbidden_error(
            "This activity type belongs to another institute",
        ));
    }
    if auth.claims.role != Role::Admin && activity_type.status != ActivityTypeStatus::Approved {
        return Err(AppError::forbidden_error(
            "This activity type is not approved yet",
        ));
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        activity_type,
        "Activity type retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update activity type", skip(pool, auth, request))]
#[patch("/{type_id}")]
pub async fn update_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<UpdateActivityTypeRequest>,
) -> Result<HttpResponse, AppError> {
    let current = administered_type(&pool, &auth.claims, path.into_inner()).await?;
    request.validate()?;

    let min_credits = request.min_credits.unwrap_or(current.min_credits);
    let max_credits = request.max_credits.unwrap_or(current.max_credits);
    validate_credits(min_credits, max_credits).map_err(AppError::validation_error)?;

    let form_schema = request
        .form_schema
        .as_deref()
        .unwrap_or(current.form_schema.as_slice());
    validate_form_schema(form_schema).map_err(AppError::validation_error)?;

    let category = match request.category.as_deref() {
        Some(category) => normalize_category(Some(category)),
        None => current.category.clone(),
    };

    let changes = ActivityTypeChanges {
        name: request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(current.name.as_str()),
        description: request
            .description
            .as_deref()
            .or(current.description.as_deref()),
        category: &category,
        status: request.status.unwrap_or(current.status),
        form_schema,
        min_credits,
        max_credits,
    };
    let activity_type = activity_types::update_activity_type(&pool, current.id, changes).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        activity_type,
        "Activity type updated successfully",
    )))
}

async fn review_type(
    pool: &PgPool,
    claims: &JwtClaims,
    id: Uuid,
    status: ActivityTypeStatus,
) -> Result<ActivityType, AppError> {
    let current = administered_type(pool, claims, id).await?;
    if !current.status.awaiting_review() {
        return Err(AppError::validation_error(format!(
            "Activity type is {} and not awaiting review",
            current.status
        )));
    }

    let activity_type = activity_types::set_status(pool, current.id, status).await?;
    tracing::info!(activity_type_id = %activity_type.id, %status, "activity type reviewed");
    Ok(activity_type)
}

#[tracing::instrument(name = "Approve activity type", skip(pool, auth))]
#[post("/{type_id}/approve")]
pub async fn approve_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let activity_type = review_type(
        &pool,
        &auth.claims,
        path.into_inner(),
        ActivityTypeStatus::Approved,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        activity_type,
        "Activity type approved",
    )))
}

#[tracing::instrument(name = "Reject activity type", skip(pool, auth))]
#[post("/{type_id}/reject")]
pub async fn reject_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let activity_type = review_type(
        &pool,
        &auth.claims,
        path.into_inner(),
        ActivityTypeStatus::Rejected,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        activity_type,
        "Activity type rejected",
    )))
}

#[tracing::instrument(name = "Delete activity type", skip(pool, auth))]
#[delete("/{type_id}")]
pub async fn delete_activity_type(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let current = administered_type(&pool, &auth.claims, path.into_inner()).await?;

    let in_use = activity_types::count_activities(&pool, current.id).await?;
    if in_use > 0 {
        return Err(AppError::conflict(format!(
            "Activity type is used by {in_use} activities and cannot be deleted"
        )));
    }

    activity_types::delete_activity_type(&pool, current.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        serde_json::json!({ "id": current.id }),
        "Activity type deleted successfully",
    )))
}
