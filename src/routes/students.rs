use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{JwtClaims, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{academics, students, users};
use crate::models::common::BulkReport;
use crate::models::pagination::PaginationQuery;
use crate::models::students::{
    BulkStudentsRequest, CreateStudentRequest, StudentProfile, StudentQuery, UpdateStudentRequest,
};
use crate::models::users::Role;

/// Creates the student, and places them in a section when a path is given,
/// in one transaction.
async fn create_one(
    pool: &PgPool,
    institute_id: Uuid,
    request: &CreateStudentRequest,
) -> Result<StudentProfile, AppError> {
    request.validate()?;
    if let Some(path) = &request.academic {
        path.check_names().map_err(AppError::validation_error)?;
    }

    let mut tx = pool.begin().await?;
    let (_, student) =
        students::create_student(&mut *tx, institute_id, &request.user, &request.roll_number)
            .await?;
    if let Some(path) = &request.academic {
        let cascade = academics::upsert_path(&mut *tx, institute_id, path).await?;
        academics::link_student(
            &mut *tx,
            institute_id,
            student.id,
            &cascade,
            request.university_id.as_deref().map(str::trim),
        )
        .await?;
    }
    tx.commit().await?;

    students::get_profile(pool, student.id).await
}

#[tracing::instrument(name = "Create student", skip(pool, auth, request))]
#[post("")]
pub async fn create_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateStudentRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let profile = create_one(&pool, institute_id, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        profile,
        "Student created successfully",
    )))
}

#[tracing::instrument(name = "Bulk create students", skip(pool, auth, request))]
#[post("/bulk")]
pub async fn bulk_create_students(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<BulkStudentsRequest>,
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
        "bulk student import finished"
    );

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Bulk student import processed",
    )))
}

#[tracing::instrument(name = "List students", skip(pool, auth))]
#[get("")]
pub async fn list_students(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<StudentQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_reviewer()?;
    let pagination = PaginationQuery::new(query.page, query.per_page);

    let (items, total) = students::list_students(
        &pool,
        institute_id,
        &query,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Students retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "My student profile", skip(pool, auth))]
#[get("/me")]
pub async fn my_profile(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let student_id = auth.claims.student()?;
    let profile = students::get_profile(&pool, student_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Student profile retrieved successfully",
    )))
}

fn may_view(claims: &JwtClaims, profile: &StudentProfile) -> bool {
    match claims.role {
        Role::Student => claims.student_id == Some(profile.id),
        Role::Admin | Role::Faculty => claims.institute_id == Some(profile.institute_id),
    }
}

#[tracing::instrument(name = "Get student", skip(pool, auth))]
#[get("/{student_id}")]
pub async fn get_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let profile = students::get_profile(&pool, path.into_inner()).await?;
    if !may_view(&auth.claims, &profile) {
        return Err(AppError::forbidden_error(
            "You are not allowed to view this student",
        ));
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Student retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update student", skip(pool, auth, request))]
#[patch("/{student_id}")]
pub async fn update_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<UpdateStudentRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;

    let student = students::get_student(&pool, path.into_inner()).await?;
    if student.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This student belongs to another institute",
        ));
    }

    let mut tx = pool.begin().await?;
    users::update_user_fields(&mut *tx, student.user_id, &request.user).await?;
    if let Some(roll_number) = &request.roll_number {
        students::update_roll_number(&mut *tx, &student, roll_number).await?;
    }
    tx.commit().await?;

    let profile = students::get_profile(&pool, student.id).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Student updated successfully",
    )))
}

#[tracing::instrument(name = "Remove student", skip(pool, auth))]
#[delete("/{student_id}")]
pub async fn remove_student(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let student = students::get_student(&pool, path.into_inner()).await?;
    if student.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This student belongs to another institute",
        ));
    }

    users::delete_user(&pool, student.user_id).await?;

    tracing::info!(student_id = %student.id, "student removed");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": student.id }),
        "Student removed successfully",
    )))
}
