use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::{JwtClaims, JwtMiddleware};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{academics, students};
use crate::models::academics::{
    build_tree, AcademicPath, BulkStructureRequest, CascadeResult, IntakeRequest, Program,
    ProgramQuery, StudentAcademicRequest, UpdateProgramRequest,
};
use crate::models::common::BulkReport;
use crate::models::users::Role;

async fn upsert_in_transaction(
    pool: &PgPool,
    institute_id: Uuid,
    path: &AcademicPath,
) -> Result<CascadeResult, AppError> {
    path.validate()?;
    path.check_names().map_err(AppError::validation_error)?;

    let mut tx = pool.begin().await?;
    let result = academics::upsert_path(&mut *tx, institute_id, path).await?;
    tx.commit().await?;
    Ok(result)
}

#[tracing::instrument(name = "Upsert academic structure", skip(pool, auth, request))]
#[post("/structure")]
pub async fn upsert_structure(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<AcademicPath>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let result = upsert_in_transaction(&pool, institute_id, &request).await?;

    let mut response = if result.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(AppSuccessResponse::new(result, "Academic structure saved")))
}

/// Each row commits on its own so one bad row never rolls back the others.
#[tracing::instrument(name = "Bulk upsert academic structure", skip(pool, auth, request))]
#[post("/structure/bulk")]
pub async fn bulk_upsert_structure(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    request: web::Json<BulkStructureRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;

    let mut report = BulkReport::default();
    for (index, path) in request.rows.iter().enumerate() {
        let outcome = upsert_in_transaction(&pool, institute_id, path)
            .await
            .map_err(|e| e.message());
        report.record(index, outcome);
    }

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "bulk structure upsert finished"
    );

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        report,
        "Bulk structure upsert processed",
    )))
}

#[tracing::instrument(name = "Academic tree", skip(pool, auth))]
#[get("/tree")]
pub async fn academic_tree(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let rows = academics::structure_rows(&pool, institute_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        build_tree(rows),
        "Academic structure retrieved",
    )))
}

#[tracing::instrument(name = "List programs", skip(pool, auth))]
#[get("/programs")]
pub async fn list_programs(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    query: web::Query<ProgramQuery>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.institute()?;
    let programs = academics::list_programs(&pool, institute_id, query.level).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        programs,
        "Programs retrieved successfully",
    )))
}

async fn owned_program(pool: &PgPool, institute_id: Uuid, id: Uuid) -> Result<Program, AppError> {
    let program = academics::get_program(pool, id).await?;
    if program.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This program belongs to another institute",
        ));
    }
    Ok(program)
}

#[tracing::instrument(name = "Update program", skip(pool, auth, request))]
#[patch("/programs/{program_id}")]
pub async fn update_program(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<UpdateProgramRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;
    let program = owned_program(&pool, institute_id, path.into_inner()).await?;

    let program = academics::update_program(&pool, program.id, &request).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        program,
        "Program updated successfully",
    )))
}

#[tracing::instrument(name = "Set program intake", skip(pool, auth))]
#[patch("/programs/{program_id}/intake")]
pub async fn set_program_intake(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<IntakeRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;
    let program = owned_program(&pool, institute_id, path.into_inner()).await?;

    let changes = UpdateProgramRequest {
        intake: Some(request.intake),
        ..Default::default()
    };
    let program = academics::update_program(&pool, program.id, &changes).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        program,
        "Program intake updated",
    )))
}

/// Refused while any student is enrolled anywhere under the program.
#[tracing::instrument(name = "Delete program", skip(pool, auth))]
#[delete("/programs/{program_id}")]
pub async fn delete_program(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    let program = owned_program(&pool, institute_id, path.into_inner()).await?;

    let enrolled = academics::enrolled_in_program(&pool, program.id).await?;
    if enrolled > 0 {
        return Err(AppError::conflict(format!(
            "Program still has {enrolled} enrolled students"
        )));
    }
    academics::delete_program(&pool, program.id).await?;

    tracing::info!(program_id = %program.id, "program deleted");
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "id": program.id }),
        "Program deleted successfully",
    )))
}

#[tracing::instrument(name = "Set student academics", skip(pool, auth, request))]
#[put("/students/{student_id}")]
pub async fn set_student_academics(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
    request: web::Json<StudentAcademicRequest>,
) -> Result<HttpResponse, AppError> {
    let institute_id = auth.claims.require_admin()?;
    request.validate()?;
    request.path.check_names().map_err(AppError::validation_error)?;

    let student = students::get_student(&pool, path.into_inner()).await?;
    if student.institute_id != institute_id {
        return Err(AppError::forbidden_error(
            "This student belongs to another institute",
        ));
    }

    let mut tx = pool.begin().await?;
    let cascade = academics::upsert_path(&mut *tx, institute_id, &request.path).await?;
    academics::link_student(
        &mut *tx,
        institute_id,
        student.id,
        &cascade,
        request.university_id.as_deref().map(str::trim),
    )
    .await?;
    tx.commit().await?;

    let details = academics::academic_details(&pool, student.id).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        details,
        "Student academics saved",
    )))
}

fn may_view_student(claims: &JwtClaims, student_id: Uuid, institute_id: Uuid) -> bool {
    match claims.role {
        Role::Student => claims.student_id == Some(student_id),
        Role::Admin | Role::Faculty => claims.institute_id == Some(institute_id),
    }
}

#[tracing::instrument(name = "Get student academics", skip(pool, auth))]
#[get("/students/{student_id}")]
pub async fn get_student_academics(
    pool: web::Data<PgPool>,
    auth: JwtMiddleware,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let student = students::get_student(&pool, path.into_inner()).await?;
    if !may_view_student(&auth.claims, student.id, student.institute_id) {
        return Err(AppError::forbidden_error(
            "You are not allowed to view this student's academics",
        ));
    }

    let details = academics::academic_details(&pool, student.id).await?;
    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        details,
        "Student academics retrieved",
    )))
}
