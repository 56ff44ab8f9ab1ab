use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::db::users::insert_user;
use crate::models::students::{like_pattern, Student, StudentProfile, StudentQuery};
use crate::models::users::{NewUser, Role, User};

const PROFILE_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.institute_id, s.roll_number, u.user_code, u.name, u.email,
           u.gender, u.phone, a.section_id, s.created_at
    FROM tbl_students s
    JOIN tbl_users u ON u.id = s.user_id
    LEFT JOIN tbl_academics a ON a.student_id = s.id
"#;

async fn roll_number_taken(
    conn: &mut PgConnection,
    institute_id: Uuid,
    roll_number: &str,
) -> Result<bool, AppError> {
    let taken = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tbl_students WHERE institute_id = $1 AND roll_number = $2)",
    )
    .bind(institute_id)
    .bind(roll_number)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

/// Creates the user identity and the student profile on one connection.
#[tracing::instrument(name = "Create student", skip(conn, new_user))]
pub async fn create_student(
    conn: &mut PgConnection,
    institute_id: Uuid,
    new_user: &NewUser,
    roll_number: &str,
) -> Result<(User, Student), AppError> {
    let roll_number = roll_number.trim();
    if roll_number_taken(&mut *conn, institute_id, roll_number).await? {
        return Err(AppError::conflict(format!(
            "Roll number {roll_number} is already registered in this institute"
        )));
    }

    let user = insert_user(&mut *conn, new_user, Role::Student).await?;
    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO tbl_students (id, user_id, institute_id, roll_number)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(institute_id)
    .bind(roll_number)
    .fetch_one(conn)
    .await?;

    Ok((user, student))
}

pub async fn get_student(pool: &PgPool, id: Uuid) -> Result<Student, AppError> {
    sqlx::query_as::<_, Student>("SELECT * FROM tbl_students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
}

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<StudentProfile, AppError> {
    let query = format!("{PROFILE_SELECT} WHERE s.id = $1");
    sqlx::query_as::<_, StudentProfile>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
}

pub async fn get_user_id(pool: &PgPool, student_id: Uuid) -> Result<Uuid, AppError> {
    sqlx::query_scalar("SELECT user_id FROM tbl_students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
}

pub async fn list_students(
    pool: &PgPool,
    institute_id: Uuid,
    query: &StudentQuery,
    limit: i64,
    offset: i64,
) -> Result<(Vec<StudentProfile>, i64), AppError> {
    const FILTER: &str = r#"
        WHERE s.institute_id = $1
          AND ($2::TEXT IS NULL OR u.gender = $2)
          AND ($3::TEXT IS NULL OR s.roll_number ILIKE $3)
          AND ($4::UUID IS NULL OR a.section_id = $4)
          AND ($5::TEXT IS NULL OR u.name ILIKE $5)
    "#;
    let roll_number = like_pattern(query.roll_number.as_deref());
    let name = query.name_pattern();

    let list_sql = format!("{PROFILE_SELECT} {FILTER} ORDER BY s.roll_number LIMIT $6 OFFSET $7");
    let students = sqlx::query_as::<_, StudentProfile>(&list_sql)
        .bind(institute_id)
        .bind(query.gender)
        .bind(&roll_number)
        .bind(query.section_id)
        .bind(&name)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!(
        r#"
        SELECT COUNT(*) FROM tbl_students s
        JOIN tbl_users u ON u.id = s.user_id
        LEFT JOIN tbl_academics a ON a.student_id = s.id
        {FILTER}
        "#
    );
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(institute_id)
        .bind(query.gender)
        .bind(&roll_number)
        .bind(query.section_id)
        .bind(&name)
        .fetch_one(pool)
        .await?;

    Ok((students, total))
}

pub async fn update_roll_number(
    conn: &mut PgConnection,
    student: &Student,
    roll_number: &str,
) -> Result<(), AppError> {
    let roll_number = roll_number.trim();
    if roll_number != student.roll_number
        && roll_number_taken(&mut *conn, student.institute_id, roll_number).await?
    {
        return Err(AppError::conflict(format!(
            "Roll number {roll_number} is already registered in this institute"
        )));
    }

    sqlx::query("UPDATE tbl_students SET roll_number = $2, updated_at = NOW() WHERE id = $1")
        .bind(student.id)
        .bind(roll_number)
        .execute(conn)
        .await?;
    Ok(())
}
