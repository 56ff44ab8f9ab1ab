use actix_web::{get, post, web, HttpResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::core::jwt_auth::{JwtKeys, JwtMiddleware, TokenSubject};
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{faculty, institutes, students, users};
use crate::models::faculty::NewFacultyRequest;
use crate::models::institutes::RegisterInstituteRequest;
use crate::models::students::RegisterStudentRequest;
use crate::models::users::{
    AuthResponse, InstituteIdQuery, LoginRequest, MeResponse, Role, User,
};

fn subject(user: &User, linkage: users::Linkage) -> TokenSubject {
    TokenSubject {
        user_id: user.id,
        user_code: user.user_code.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        institute_id: linkage.institute_id,
        profile_id: linkage.profile_id,
    }
}

fn issue_token(
    keys: &JwtKeys,
    user: &User,
    linkage: users::Linkage,
) -> Result<String, AppError> {
    keys.generate(&keys.claims_for(subject(user, linkage)))
}

async fn ensure_institute(pool: &PgPool, query: &InstituteIdQuery) -> Result<(), AppError> {
    if !institutes::institute_exists(pool, query.institute_id).await? {
        return Err(AppError::not_found("Institute not found"));
    }
    Ok(())
}

#[tracing::instrument(name = "Register institute", skip(pool, keys, request))]
#[post("/institute/register")]
pub async fn register_institute(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    request: web::Json<RegisterInstituteRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    request
        .institute
        .check_affiliation()
        .map_err(AppError::validation_error)?;

    let mut tx = pool.begin().await?;
    let institute = institutes::insert_institute(&mut *tx, &request.institute).await?;
    let admin = users::insert_user(&mut *tx, &request.admin, Role::Admin).await?;
    let admin_id = users::insert_admin(&mut *tx, admin.id, institute.id).await?;
    tx.commit().await?;

    let token = issue_token(
        &keys,
        &admin,
        users::Linkage {
            institute_id: Some(institute.id),
            profile_id: Some(admin_id),
        },
    )?;

    tracing::info!(institute_id = %institute.id, "institute registered");

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        AuthResponse {
            user: admin.into(),
            token,
            institute: Some(institute),
        },
        "Institute registered successfully",
    )))
}

#[tracing::instrument(name = "Register student", skip(pool, keys, request))]
#[post("/student/register")]
pub async fn register_student(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    query: web::Query<InstituteIdQuery>,
    request: web::Json<RegisterStudentRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    ensure_institute(&pool, &query).await?;

    let mut tx = pool.begin().await?;
    let (user, student) =
        students::create_student(&mut *tx, query.institute_id, &request.user, &request.roll_number)
            .await?;
    tx.commit().await?;

    let token = issue_token(
        &keys,
        &user,
        users::Linkage {
            institute_id: Some(student.institute_id),
            profile_id: Some(student.id),
        },
    )?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        AuthResponse {
            user: user.into(),
            token,
            institute: None,
        },
        "Student registered successfully",
    )))
}

#[tracing::instrument(name = "Register faculty", skip(pool, keys, request))]
#[post("/faculty/register")]
pub async fn register_faculty(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    query: web::Query<InstituteIdQuery>,
    request: web::Json<NewFacultyRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    ensure_institute(&pool, &query).await?;

    let mut tx = pool.begin().await?;
    let (user, profile) = faculty::create_faculty(&mut *tx, query.institute_id, &request).await?;
    tx.commit().await?;

    let token = issue_token(
        &keys,
        &user,
        users::Linkage {
            institute_id: Some(profile.institute_id),
            profile_id: Some(profile.id),
        },
    )?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        AuthResponse {
            user: user.into(),
            token,
            institute: None,
        },
        "Faculty registered successfully",
    )))
}

#[tracing::instrument(name = "User login", skip(pool, keys, request), fields(email = %request.email))]
#[post("/user/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    const INVALID: &str = "Invalid email or password";
    request.validate()?;

    let user = users::find_user_by_email(&pool, &request.email)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID))?;

    if !users::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::unauthorized(INVALID));
    }

    let linkage = users::linkage_for(&pool, &user).await?;
    if linkage.institute_id.is_none() {
        tracing::warn!(user_id = %user.id, "user has no institute linkage");
    }
    let institute = match linkage.institute_id {
        Some(id) => Some(institutes::get_institute(&pool, id).await?),
        None => None,
    };
    let token = issue_token(&keys, &user, linkage)?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        AuthResponse {
            user: user.into(),
            token,
            institute,
        },
        "Login successful",
    )))
}

/// Claims are rebuilt from the database so role or linkage changes show up
/// without logging in again.
#[tracing::instrument(name = "Current user", skip(pool, keys, auth))]
#[get("/me")]
pub async fn me(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let user = users::get_user(&pool, auth.user_id).await?;
    let linkage = users::linkage_for(&pool, &user).await?;

    let claims = keys.claims_for(subject(&user, linkage));

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MeResponse {
            user: user.into(),
            claims,
        },
        "Current user retrieved",
    )))
}
