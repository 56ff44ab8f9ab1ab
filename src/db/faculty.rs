use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::db::users::insert_user;
use crate::models::faculty::{FacultyProfile, FacultyQuery, NewFacultyRequest};
use crate::models::students::like_pattern;
use crate::models::users::{Role, User};

const PROFILE_SELECT: &str = r#"
    SELECT f.id, f.user_id, f.institute_id, f.employee_code, f.designation, f.department,
           u.user_code, u.name, u.email, u.gender, u.phone, f.created_at
    FROM tbl_faculty f
    JOIN tbl_users u ON u.id = f.user_id
"#;

async fn employee_code_taken(
    conn: &mut PgConnection,
    institute_id: Uuid,
    employee_code: &str,
) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tbl_faculty WHERE institute_id = $1 AND employee_code = $2)",
    )
    .bind(institute_id)
    .bind(employee_code)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

#[tracing::instrument(name = "Create faculty", skip(conn, request))]
pub async fn create_faculty(
    conn: &mut PgConnection,
    institute_id: Uuid,
    request: &NewFacultyRequest,
) -> Result<(User, FacultyProfile), AppError> {
    let employee_code = request.employee_code.trim();
    if employee_code_taken(&mut *conn, institute_id, employee_code).await? {
        return Err(AppError::conflict(format!(
            "Employee code {employee_code} is already registered in this institute"
        )));
    }

    let user = insert_user(&mut *conn, &request.user, Role::Faculty).await?;
    let faculty_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO tbl_faculty (id, user_id, institute_id, employee_code, designation, department)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(institute_id)
    .bind(employee_code)
    .bind(request.designation.trim())
    .bind(request.department.trim())
    .fetch_one(&mut *conn)
    .await?;

    let query = format!("{PROFILE_SELECT} WHERE f.id = $1");
    let profile = sqlx::query_as::<_, FacultyProfile>(&query)
        .bind(faculty_id)
        .fetch_one(conn)
        .await?;

    Ok((user, profile))
}

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<FacultyProfile, AppError> {
    let query = format!("{PROFILE_SELECT} WHERE f.id = $1");
    sqlx::query_as::<_, FacultyProfile>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Faculty not found"))
}

pub async fn list_faculty(
    pool: &PgPool,
    institute_id: Uuid,
    query: &FacultyQuery,
    limit: i64,
    offset: i64,
) -> Result<(Vec<FacultyProfile>, i64), AppError> {
    const FILTER: &str = r#"
        WHERE f.institute_id = $1
          AND ($2::TEXT IS NULL OR f.department ILIKE $2)
          AND ($3::TEXT IS NULL OR f.designation ILIKE $3)
          AND ($4::TEXT IS NULL OR f.employee_code ILIKE $4)
          AND ($5::TEXT IS NULL OR u.name ILIKE $5)
    "#;
    let department = like_pattern(query.department.as_deref());
    let designation = like_pattern(query.designation.as_deref());
    let employee_code = like_pattern(query.employee_code.as_deref());
    let name = like_pattern(query.name.as_deref());

    let list_sql = format!("{PROFILE_SELECT} {FILTER} ORDER BY u.name LIMIT $6 OFFSET $7");
    let faculty = sqlx::query_as::<_, FacultyProfile>(&list_sql)
        .bind(institute_id)
        .bind(&department)
        .bind(&designation)
        .bind(&employee_code)
        .bind(&name)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM tbl_faculty f JOIN tbl_users u ON u.id = f.user_id {FILTER}"
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(institute_id)
        .bind(&department)
        .bind(&designation)
        .bind(&employee_code)
        .bind(&name)
        .fetch_one(pool)
        .await?;

    Ok((faculty, total))
}

pub async fn update_faculty(
    conn: &mut PgConnection,
    profile: &FacultyProfile,
    employee_code: Option<&str>,
    designation: Option<&str>,
    department: Option<&str>,
) -> Result<(), AppError> {
    let employee_code = employee_code.map(str::trim);
    if let Some(code) = employee_code {
        if code != profile.employee_code
            && employee_code_taken(&mut *conn, profile.institute_id, code).await?
        {
            return Err(AppError::conflict(format!(
                "Employee code {code} is already registered in this institute"
            )));
        }
    }

    sqlx::query(
        r#"
        UPDATE tbl_faculty
        SET employee_code = COALESCE($2, employee_code),
            designation = COALESCE($3, designation),
            department = COALESCE($4, department),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(profile.id)
    .bind(employee_code)
    .bind(designation.map(str::trim))
    .bind(department.map(str::trim))
    .execute(conn)
    .await?;
    Ok(())
}
