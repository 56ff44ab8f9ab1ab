use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{activities, activity_types, assignments, faculty};
use crate::models::activities::{Activity, ActivityResponse};
use crate::models::assignments::{
    ActivityAssignmentQuery, AssignActivityRequest, AssignOutcome, AssignmentQuery,
    BulkActivityAssignRow, BulkAssignActivitiesRequest, BulkAssignReport, BulkAssignRequest,
    BulkAssignRow, CreateAssignmentRequest,
};
use crate::models::pagination::PaginationQuery;

async fn ensure_faculty_of(
    pool: &PgPool,
    faculty_id: Uuid,
    institute_id: Uuid,
) -> Result<(), AppError> {
    let profile = faculty::get_profile(pool, faculty_id).await?;
    if profile.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This faculty member belongs to another institute",
        ));
    }
    Ok(())
}

async fn ensure_assignable_type(
    pool: &PgPool,
    activity_type_id: Uuid,
    institute_id: Uuid,
) -> Result<(), AppError> {
    let activity_type = activity_types::get_activity_type(pool, activity_type_id).await?;
    if !activity_type.visible_to(institute_id) {
        return Err(AppError::forbidden_error(
            "This activity type belongs to another institute",
        ));
    }
    Ok(())
}

#[tracing::instrument(name = "Assign activity type", skip(pool, auth))]
#[post("")]
pub async fn assign(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateAssignmentRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    ensure_assignable_type(&pool, request.activity_type_id, institute_id).await?;
    ensure_faculty_of(&pool, request.faculty_id, institute_id).await?;

    let assignment = assignments::insert_assignment(
        &pool,
        request.activity_type_id,
        request.faculty_id,
        institute_id,
    )
    .await?
    .ok_or_else(|| AppError::conflict("Activity type is already assigned to this faculty"))?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        assignment,
        "Activity type assigned successfully",
    )))
}

#[tracing::instrument(name = "Bulk assign activity types", skip(pool, auth, request))]
#[post("/bulk")]
pub async fn bulk_assign(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<BulkAssignRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;
    ensure_faculty_of(&pool, request.faculty_id, institute_id).await?;

    let mut rows = Vec::with_capacity(request.activity_type_ids.len());
    for &activity_type_id in &request.activity_type_ids {
        let outcome = match ensure_assignable_type(&pool, activity_type_id, institute_id).await {
            Ok(()) => {
                assignments::insert_assignment(
                    &pool,
                    activity_type_id,
                    request.faculty_id,
                    institute_id,
                )
                .await
            }
            Err(e) => Err(e),
        };

        rows.push(match outcome {
            Ok(Some(_)) => BulkAssignRow {
                activity_type_id,
                outcome: AssignOutcome::Assigned,
                error: None,
            },
            Ok(None) => BulkAssignRow {
                activity_type_id,
                outcome: AssignOutcome::AlreadyAssigned,
                error: None,
            },
            Err(e) => BulkAssignRow {
                activity_type_id,
                outcome: AssignOutcome::Failed,
                error: Some(e.message()),
            },
        });
    }

    let report = BulkAssignReport::from_rows(rows);
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Bulk assignment processed",
    )))
}

#[tracing::instrument(name = "Unassign activity type", skip(pool, auth))]
#[delete("/{assignment_id}")]
pub async fn unassign(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let assignment = assignments::get_assignment(&pool, path.into_inner()).await?;
    if assignment.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This assignment belongs to another institute",
        ));
    }

    assignments::delete_assignment(&pool, assignment.id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        assignment,
        "Activity type unassigned successfully",
    )))
}

#[tracing::instrument(name = "List assignments", skip(pool, auth))]
#[get("")]
pub async fn list_assignments(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<AssignmentQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let items = assignments::list_assignments(
        &pool,
        institute_id,
        query.faculty_id,
        query.activity_type_id,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Assignments retrieved successfully",
    )))
}

#[tracing::instrument(name = "My assigned activity types", skip(pool, auth))]
#[get("/me")]
pub async fn my_assigned_types(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let faculty_id = auth.claims.faculty()?;
    let types = assignments::types_for_faculty(&pool, faculty_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        types,
        "Assigned activity types retrieved successfully",
    )))
}

#[tracing::instrument(name = "My review queue", skip(pool, auth))]
#[get("/me/pending-activities")]
pub async fn my_pending_activities(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let faculty_id = auth.claims.faculty()?;
    let institute_id = auth.claims.institute()?;
    let mut pagination = query.into_inner();
    pagination.validate();

    let (items, total) = activities::pending_for_faculty(
        &pool,
        faculty_id,
        institute_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    let items: Vec<ActivityResponse> = items.into_iter().map(ActivityResponse::from).collect();
    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Pending activities retrieved successfully",
        pagination.meta(total),
    )))
}

async fn ensure_activity_of(
    pool: &PgPool,
    activity_id: Uuid,
    institute_id: Uuid,
) -> Result<Activity, AppError> {
    let activity = activities::get_activity(pool, activity_id).await?;
    if activity.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This activity belongs to another institute",
        ));
    }
    Ok(activity)
}

#[tracing::instrument(name = "Assign activity", skip(pool, auth))]
#[post("")]
pub async fn assign_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<AssignActivityRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    ensure_activity_of(&pool, request.activity_id, institute_id).await?;
    ensure_faculty_of(&pool, request.faculty_id, institute_id).await?;

    let inserted = assignments::insert_activity_assignment(
        &pool,
        request.activity_id,
        request.faculty_id,
        institute_id,
    )
    .await?;
    let assignment = match inserted {
        Some(assignment) => assignment,
        None => {
            let current = assignments::activity_assignment(&pool, request.activity_id).await?;
            return Err(AppError::conflict(match current {
                Some(current) => format!(
                    "Activity is already assigned to faculty {}",
                    current.faculty_id
                ),
                None => "Activity is already assigned".to_string(),
            }));
        }
    };

    tracing::info!(
        activity_id = %assignment.activity_id,
        faculty_id = %assignment.faculty_id,
        "activity assigned"
    );
    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        assignment,
        "Activity assigned successfully",
    )))
}

async fn assign_row(
    pool: &PgPool,
    activity_id: Uuid,
    faculty_id: Uuid,
    institute_id: Uuid,
) -> Result<BulkActivityAssignRow, AppError> {
    ensure_activity_of(pool, activity_id, institute_id).await?;

    if let Some(current) = assignments::activity_assignment(pool, activity_id).await? {
        return Ok(BulkActivityAssignRow::existing(
            activity_id,
            faculty_id,
            current.faculty_id,
        ));
    }
    let inserted =
        assignments::insert_activity_assignment(pool, activity_id, faculty_id, institute_id).await?;
    let row = match inserted {
        Some(_) => BulkActivityAssignRow {
            activity_id,
            outcome: AssignOutcome::Assigned,
            current_faculty_id: None,
            error: None,
        },
        // Lost a race with another assignment.
        None => BulkActivityAssignRow {
            activity_id,
            outcome: AssignOutcome::Failed,
            current_faculty_id: None,
            error: Some("Activity was assigned concurrently".to_string()),
        },
    };
    Ok(row)
}

#[tracing::instrument(name = "Bulk assign activities", skip(pool, auth, request))]
#[post("/bulk")]
pub async fn bulk_assign_activities(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<BulkAssignActivitiesRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;
    ensure_faculty_of(&pool, request.faculty_id, institute_id).await?;

    let mut rows = Vec::with_capacity(request.activity_ids.len());
    for &activity_id in &request.activity_ids {
        let row = assign_row(&pool, activity_id, request.faculty_id, institute_id)
            .await
            .unwrap_or_else(|e| BulkActivityAssignRow {
                activity_id,
                outcome: AssignOutcome::Failed,
                current_faculty_id: None,
                error: Some(e.message()),
            });
        rows.push(row);
    }

    let report = BulkAssignReport::from_rows(rows);
    tracing::info!(
        assigned = report.assigned,
        failed = report.failed,
        "bulk activity assignment finished"
    );
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Bulk activity assignment processed",
    )))
}

#[tracing::instrument(name = "Reassign activity", skip(pool, auth))]
#[patch("/reassign")]
pub async fn reassign_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<AssignActivityRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    ensure_activity_of(&pool, request.activity_id, institute_id).await?;
    ensure_faculty_of(&pool, request.faculty_id, institute_id).await?;

    let assignment = assignments::reassign_activity(&pool, request.activity_id, request.faculty_id)
        .await?
        .ok_or_else(|| AppError::not_found("No assignment found for this activity"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        assignment,
        "Activity reassigned successfully",
    )))
}

#[tracing::instrument(name = "List activity assignments", skip(pool, auth))]
#[get("")]
pub async fn list_activity_assignments(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ActivityAssignmentQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let items = assignments::list_activity_assignments(
        &pool,
        institute_id,
        query.faculty_id,
        query.activity_id,
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Activity assignments retrieved successfully",
    )))
}

#[tracing::instrument(name = "Faculty assignment counts", skip(pool, auth))]
#[get("/faculty-counts")]
pub async fn faculty_counts(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let counts = assignments::faculty_assignment_counts(&pool, institute_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        counts,
        "Faculty assignment counts retrieved",
    )))
}

#[tracing::instrument(name = "My assigned activities", skip(pool, auth))]
#[get("/me")]
pub async fn my_assigned_activities(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let faculty_id = auth.claims.faculty()?;
    let items: Vec<ActivityResponse> = assignments::activities_for_faculty(&pool, faculty_id)
        .await?
        .into_iter()
        .map(ActivityResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Assigned activities retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get activity assignment", skip(pool, auth))]
#[get("/activity/{activity_id}")]
pub async fn activity_assignment(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let activity = ensure_activity_of(&pool, path.into_inner(), institute_id).await?;
    let assignment = assignments::activity_assignment(&pool, activity.id)
        .await?
        .ok_or_else(|| AppError::not_found("No assignment found for this activity"))?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        assignment,
        "Activity assignment retrieved successfully",
    )))
}

#[tracing::instrument(name = "Unassign activity", skip(pool, auth))]
#[delete("/activity/{activity_id}")]
pub async fn unassign_activity(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let activity = ensure_activity_of(&pool, path.into_inner(), institute_id).await?;
    if !assignments::delete_activity_assignment(&pool, activity.id).await? {
        return Err(AppError::not_found("No assignment found for this activity"));
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "activity_id": activity.id }),
        "Activity unassigned successfully",
    )))
}
