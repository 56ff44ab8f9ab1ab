use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{JwtClaims, JwtMiddleware};
use crate::core::realtime::EventHub;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::activities::{self, ActivityChanges, ActivityFilter, ActivityScope};
use crate::db::{activity_types, assignments, students};
use crate::models::activities::{
    check_visibility, earned_credits, ensure_pending, validate_dates, validate_media, Activity,
    ActivityQuery, ActivityResponse, ActivityStatus, ApproveActivityRequest,
    CreateActivityRequest, RejectActivityRequest, ReviewDecision, UpdateActivityRequest, Viewer,
};
use crate::models::activity_types::{validate_details, ActivityTypeStatus};
use crate::models::notifications::{NewNotification, NotificationKind};
use crate::models::pagination::PaginationQuery;
use crate::models::users::Role;
use crate::routes::notifications::notify_quietly;

fn viewer(claims: &JwtClaims) -> Result<Viewer, AppError> {
    match claims.role {
        Role::Student => Ok(Viewer::Student {
            student_id: claims.student()?,
        }),
        Role::Admin | Role::Faculty => Ok(Viewer::Reviewer {
            institute_id: claims.institute()?,
        }),
    }
}

/// The caller's own activity, still open for edits.
async fn owned_pending(
    pool: &PgPool,
    claims: &JwtClaims,
    id: Uuid,
    action: &str,
) -> Result<Activity, AppError> {
    let student_id = claims.student()?;
    let activity = activities::get_activity(pool, id).await?;

    if activity.student_id != student_id {
        return Err(AppError::forbidden_error(format!(
            "You can only {action} your own activities"
        )));
    }
    ensure_pending(activity.status, action).map_err(AppError::validation_error)?;
    Ok(activity)
}

#[tracing::instrument(name = "Create activity", skip(pool, auth, request))]
#[post("")]
pub async fn create_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateActivityRequest>,
) -> Result<HttpResponse, AppError> {
    let student_id = auth.claims.student()?;
    let institute_id = auth.claims.institute()?;

    request.validate()?;
    validate_media(&request.attachments, &request.social_links)?;
    validate_dates(request.date_start, request.date_end).map_err(AppError::validation_error)?;

    let activity_type = activity_types::get_activity_type(&pool, request.activity_type_id).await?;
    if !activity_type.visible_to(institute_id) {
        return Err(AppError::forbidden_error(
            "This activity type belongs to another institute",
        ));
    }
    if activity_type.status != ActivityTypeStatus::Approved {
        return Err(AppError::validation_error(
            "Activities can only be logged against approved activity types",
        ));
    }
    validate_details(&activity_type.form_schema, &request.details)
        .map_err(AppError::validation_error)?;

    let activity = activities::insert_activity(&pool, student_id, institute_id, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        ActivityResponse::from(activity),
        "Activity created successfully",
    )))
}

#[tracing::instrument(name = "List activities", skip(pool, auth))]
#[get("")]
pub async fn list_activities(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let scope = match viewer(&auth.claims)? {
        Viewer::Student { student_id } => ActivityScope::Owner { student_id },
        Viewer::Reviewer { institute_id } => ActivityScope::Institute { institute_id },
    };
    let pagination = PaginationQuery::new(query.page, query.per_page);

    let (items, total) = activities::list_activities(
        &pool,
        ActivityFilter {
            scope,
            status: query.status,
            activity_type_id: query.activity_type_id,
            student_id: query.student_id,
            limit: pagination.limit(),
            offset: pagination.offset(),
        },
    )
    .await?;

    let items: Vec<ActivityResponse> = items.into_iter().map(ActivityResponse::from).collect();
    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Activities retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Activity stats", skip(pool, auth))]
#[get("/stats/summary")]
pub async fn activity_stats(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let scope = match viewer(&auth.claims)? {
        Viewer::Student { student_id } => ActivityScope::Owner { student_id },
        Viewer::Reviewer { institute_id } => ActivityScope::Institute { institute_id },
    };
    let stats = activities::stats(&pool, scope).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        stats,
        "Activity stats retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get activity", skip(pool, auth))]
#[get("/{activity_id}")]
pub async fn get_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let activity = activities::get_activity(&pool, path.into_inner()).await?;
    check_visibility(&activity, viewer(&auth.claims)?).map_err(AppError::forbidden_error)?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        ActivityResponse::from(activity),
        "Activity retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update activity", skip(pool, auth, request))]
#[patch("/{activity_id}")]
pub async fn update_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<UpdateActivityRequest>,
) -> Result<HttpResponse, AppError> {
    let current = owned_pending(&pool, &auth.claims, path.into_inner(), "update").await?;
    request.validate()?;

    let attachments = request
        .attachments
        .as_deref()
        .unwrap_or(current.attachments.as_slice());
    let social_links = request
        .social_links
        .as_deref()
        .unwrap_or(current.social_links.as_slice());
    validate_media(attachments, social_links)?;

    let date_start = request.date_start.or(current.date_start);
    let date_end = request.date_end.or(current.date_end);
    validate_dates(date_start, date_end).map_err(AppError::validation_error)?;

    let details = request.details.as_ref().unwrap_or(&current.details.0);
    let activity_type = activity_types::get_activity_type(&pool, current.activity_type_id).await?;
    validate_details(&activity_type.form_schema, details).map_err(AppError::validation_error)?;

    let changes = ActivityChanges {
        title: request
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(current.title.as_str()),
        description: request
            .description
            .as_deref()
            .or(current.description.as_deref()),
        skills: request.skills.as_deref().unwrap_or(current.skills.as_slice()),
        details,
        is_public: request.is_public.unwrap_or(current.is_public),
        date_start,
        date_end,
        attachments,
        social_links,
    };

    let activity = activities::update_pending_activity(&pool, current.id, changes)
        .await?
        .ok_or_else(|| AppError::validation_error("Activity has already been reviewed"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        ActivityResponse::from(activity),
        "Activity updated successfully",
    )))
}

#[tracing::instrument(name = "Delete activity", skip(pool, auth))]
#[delete("/{activity_id}")]
pub async fn delete_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let current = owned_pending(&pool, &auth.claims, path.into_inner(), "delete").await?;

    if !activities::delete_pending_activity(&pool, current.id).await? {
        return Err(AppError::validation_error(
            "Activity has already been reviewed",
        ));
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": current.id }),
        "Activity deleted successfully",
    )))
}

/// Loads an activity the caller may review. Faculty must hold the activity's
/// own assignment when it has one, else a type assignment whenever anyone in
/// the institute holds one.
async fn reviewable(
    pool: &PgPool,
    claims: &JwtClaims,
    id: Uuid,
    action: &str,
) -> Result<Activity, AppError> {
    let institute_id = claims.require_reviewer()?;
    let activity = activities::get_activity(pool, id).await?;

    if activity.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This activity belongs to another institute",
        ));
    }
    if claims.role == Role::Faculty {
        let faculty_id = claims.faculty()?;
        if !assignments::may_review_activity(pool, &activity, faculty_id).await? {
            return Err(AppError::forbidden_error(
                "You are not assigned to review this activity",
            ));
        }
    }
    ensure_pending(activity.status, action).map_err(AppError::validation_error)?;
    Ok(activity)
}

async fn apply_review(
    pool: &PgPool,
    reviewer_id: Uuid,
    activity: &Activity,
    decision: &ReviewDecision,
) -> Result<Activity, AppError> {
    let mut conn = pool.acquire().await?;
    activities::apply_review(&mut *conn, activity.id, reviewer_id, decision)
        .await?
        .ok_or_else(|| AppError::validation_error("Activity has already been reviewed"))
}

async fn notify_owner(pool: &PgPool, hub: &EventHub, activity: &Activity) {
    let user_id = match students::get_user_id(pool, activity.student_id).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(activity_id = %activity.id, error = %e, "activity owner not found");
            return;
        }
    };

    let notification = match activity.status {
        ActivityStatus::Rejected => NewNotification::new(
            user_id,
            NotificationKind::ActivityRejected,
            "Activity rejected",
            format!(
                "Your activity \"{}\" was rejected: {}",
                activity.title,
                activity.rejection_reason.as_deref().unwrap_or_default()
            ),
        ),
        _ => NewNotification::new(
            user_id,
            NotificationKind::ActivityApproved,
            "Activity approved",
            format!(
                "Your activity \"{}\" was approved with {} credits",
                activity.title,
                activity.credits_earned.unwrap_or_default()
            ),
        ),
    }
    .related_to(activity.id)
    .with_metadata(json!({
        "activity_id": activity.id,
        "status": activity.status,
        "credits_earned": activity.credits_earned,
    }));

    notify_quietly(pool, hub, notification).await;
}

/// Review bodies may be omitted entirely; anything sent must parse.
fn optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation_error(format!("Invalid body: {e}")))
}

#[tracing::instrument(name = "Approve activity", skip(pool, hub, auth, body))]
#[post("/{activity_id}/approve")]
pub async fn approve_activity(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request: ApproveActivityRequest = optional_body(&body)?;
    let activity = reviewable(&pool, &auth.claims, path.into_inner(), "approve").await?;

    let activity_type = activity_types::get_activity_type(&pool, activity.activity_type_id).await?;
    let credits_earned = earned_credits(
        request.credits_awarded,
        activity_type.min_credits,
        activity_type.max_credits,
    )
    .map_err(AppError::validation_error)?;

    let decision = ReviewDecision::Approve {
        credits_awarded: request.credits_awarded,
        credits_earned,
        remarks: request
            .remarks
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
    };
    let activity = apply_review(&pool, auth.user_id, &activity, &decision).await?;

    tracing::info!(activity_id = %activity.id, credits_earned, "activity approved");
    notify_owner(&pool, &hub, &activity).await;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        ActivityResponse::from(activity),
        "Activity approved successfully",
    )))
}

#[tracing::instrument(name = "Reject activity", skip(pool, hub, auth, body))]
#[post("/{activity_id}/reject")]
pub async fn reject_activity(
    pool: web::Data<PgPool>,
    hub: web::Data<EventHub>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let request: RejectActivityRequest = optional_body(&body)?;
    let activity = reviewable(&pool, &auth.claims, path.into_inner(), "reject").await?;
    let reason = request.reason().map_err(AppError::validation_error)?;

    let decision = ReviewDecision::Reject { reason };
    let activity = apply_review(&pool, auth.user_id, &activity, &decision).await?;

    tracing::info!(activity_id = %activity.id, "activity rejected");
    notify_owner(&pool, &hub, &activity).await;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        ActivityResponse::from(activity),
        "Activity rejected successfully",
    )))
}
