use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::users::{generate_user_code, NewUser, Role, UpdateUserFields, User};

const USER_CODE_ATTEMPTS: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            tracing::error!("Failed to hash password: {:?}", e);
            AppError::internal_error("Failed to hash password")
        })
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        tracing::error!("Stored password hash is malformed: {:?}", e);
        AppError::internal_error("Failed to verify password")
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

async fn unique_user_code(conn: &mut PgConnection, role: Role) -> Result<String, AppError> {
    for _ in 0..USER_CODE_ATTEMPTS {
        let code = generate_user_code(role);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tbl_users WHERE user_code = $1)")
                .bind(&code)
                .fetch_one(&mut *conn)
                .await?;
        if !taken {
            return Ok(code);
        }
    }

    Err(AppError::internal_error("Could not allocate a unique user code"))
}

pub async fn email_taken(conn: &mut PgConnection, email: &str) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tbl_users WHERE email = $1)")
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(taken)
}

#[tracing::instrument(name = "Insert user", skip(conn, new_user), fields(email = %new_user.email))]
pub async fn insert_user(
    conn: &mut PgConnection,
    new_user: &NewUser,
    role: Role,
) -> Result<User, AppError> {
    let email = new_user.normalized_email();
    if email_taken(&mut *conn, &email).await? {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    let user_code = unique_user_code(&mut *conn, role).await?;
    let password_hash = hash_password(&new_user.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO tbl_users (id, user_code, name, email, password_hash, role, gender, phone, alternate_phone, address)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&user_code)
    .bind(new_user.name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(role)
    .bind(new_user.gender)
    .bind(new_user.phone.trim())
    .bind(&new_user.alternate_phone)
    .bind(&new_user.address)
    .fetch_one(conn)
    .await?;

    Ok(user)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM tbl_users WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM tbl_users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn user_exists(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tbl_users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Deleting the identity cascades to its role profile and everything the
/// profile owns; review and authorship references are nulled.
#[tracing::instrument(name = "Delete user", skip(pool))]
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM tbl_users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    Ok(())
}

pub async fn update_user_fields(
    conn: &mut PgConnection,
    user_id: Uuid,
    fields: &UpdateUserFields,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE tbl_users
        SET name = COALESCE($2, name),
            gender = COALESCE($3, gender),
            phone = COALESCE($4, phone),
            alternate_phone = COALESCE($5, alternate_phone),
            address = COALESCE($6, address),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(fields.name.as_deref().map(str::trim))
    .bind(fields.gender)
    .bind(fields.phone.as_deref().map(str::trim))
    .bind(&fields.alternate_phone)
    .bind(&fields.address)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn insert_admin(
    conn: &mut PgConnection,
    user_id: Uuid,
    institute_id: Uuid,
) -> Result<Uuid, AppError> {
    let admin_id = sqlx::query_scalar(
        "INSERT INTO tbl_admins (id, user_id, institute_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(institute_id)
    .fetch_one(conn)
    .await?;
    Ok(admin_id)
}

/// The institute and role profile a user is linked to, if any.
#[derive(Debug, Default, sqlx::FromRow)]
pub struct Linkage {
    pub institute_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
}

pub async fn linkage_for(pool: &PgPool, user: &User) -> Result<Linkage, AppError> {
    let table = match user.role {
        Role::Admin => "tbl_admins",
        Role::Student => "tbl_students",
        Role::Faculty => "tbl_faculty",
    };
    let query = format!("SELECT institute_id, id AS profile_id FROM {table} WHERE user_id = $1");

    let linkage = sqlx::query_as::<_, Linkage>(&query)
        .bind(user.id)
        .fetch_optional(pool)
        .await?
        .unwrap_or_default();
    Ok(linkage)
}
