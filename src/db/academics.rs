use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::academics::{
    Academic, AcademicDetails, AcademicPath, CascadeResult, Program, ProgramLevel, StructureRow,
    UpdateProgramRequest, DEFAULT_SEAT_CAPACITY,
};

#[derive(Clone, Copy)]
enum NodeKey<'a> {
    Name(&'a str),
    Number(i32),
}

/// Find-or-create one hierarchy node under `parent_id`. Returns the id and
/// whether a row was inserted.
async fn find_or_create(
    conn: &mut PgConnection,
    table: &str,
    parent_column: &str,
    key_column: &str,
    parent_id: Uuid,
    key: NodeKey<'_>,
) -> Result<(Uuid, bool), AppError> {
    let insert_sql = format!(
        "INSERT INTO {table} (id, {parent_column}, {key_column}) VALUES ($1, $2, $3) \
         ON CONFLICT ({parent_column}, {key_column}) DO NOTHING RETURNING id"
    );
    let insert = sqlx::query_scalar::<_, Uuid>(&insert_sql)
        .bind(Uuid::new_v4())
        .bind(parent_id);
    let insert = match key {
        NodeKey::Name(name) => insert.bind(name),
        NodeKey::Number(number) => insert.bind(number),
    };

    if let Some(id) = insert.fetch_optional(&mut *conn).await? {
        return Ok((id, true));
    }

    let select_sql =
        format!("SELECT id FROM {table} WHERE {parent_column} = $1 AND {key_column} = $2");
    let select = sqlx::query_scalar::<_, Uuid>(&select_sql).bind(parent_id);
    let select = match key {
        NodeKey::Name(name) => select.bind(name),
        NodeKey::Number(number) => select.bind(number),
    };

    Ok((select.fetch_one(conn).await?, false))
}

async fn find_or_create_program(
    conn: &mut PgConnection,
    institute_id: Uuid,
    level: ProgramLevel,
    name: &str,
) -> Result<(Uuid, bool), AppError> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO tbl_programs (id, institute_id, level, name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (institute_id, level, name) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(institute_id)
    .bind(level)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        return Ok((id, true));
    }

    let id = sqlx::query_scalar(
        "SELECT id FROM tbl_programs WHERE institute_id = $1 AND level = $2 AND name = $3",
    )
    .bind(institute_id)
    .bind(level)
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok((id, false))
}

async fn find_or_create_section(
    conn: &mut PgConnection,
    semester_id: Uuid,
    name: &str,
    seat_capacity: Option<i32>,
) -> Result<(Uuid, bool), AppError> {
    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO tbl_sections (id, semester_id, name, seat_capacity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (semester_id, name) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(semester_id)
    .bind(name)
    .bind(seat_capacity.unwrap_or(DEFAULT_SEAT_CAPACITY))
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        return Ok((id, true));
    }

    // An explicit capacity on an existing section replaces the stored one.
    let id = sqlx::query_scalar(
        r#"
        UPDATE tbl_sections
        SET seat_capacity = COALESCE($3, seat_capacity)
        WHERE semester_id = $1 AND name = $2
        RETURNING id
        "#,
    )
    .bind(semester_id)
    .bind(name)
    .bind(seat_capacity)
    .fetch_one(conn)
    .await?;
    Ok((id, false))
}

/// Walks program → section creating whatever is missing. Callers run this
/// inside a transaction so a failure leaves no partial path behind.
#[tracing::instrument(name = "Upsert academic path", skip(conn, path), fields(program = %path.program))]
pub async fn upsert_path(
    conn: &mut PgConnection,
    institute_id: Uuid,
    path: &AcademicPath,
) -> Result<CascadeResult, AppError> {
    let path = path.normalized();

    let (program_id, p) =
        find_or_create_program(&mut *conn, institute_id, path.level, &path.program).await?;
    let (degree_id, d) = find_or_create(
        &mut *conn,
        "tbl_degrees",
        "program_id",
        "name",
        program_id,
        NodeKey::Name(&path.degree),
    )
    .await?;
    let (branch_id, b) = find_or_create(
        &mut *conn,
        "tbl_branches",
        "degree_id",
        "name",
        degree_id,
        NodeKey::Name(&path.branch),
    )
    .await?;
    let (specialization_id, s) = find_or_create(
        &mut *conn,
        "tbl_specializations",
        "branch_id",
        "name",
        branch_id,
        NodeKey::Name(path.specialization_name()),
    )
    .await?;
    let (year_level_id, y) = find_or_create(
        &mut *conn,
        "tbl_year_levels",
        "specialization_id",
        "year",
        specialization_id,
        NodeKey::Number(path.year),
    )
    .await?;
    let (semester_id, sem) = find_or_create(
        &mut *conn,
        "tbl_semesters",
        "year_level_id",
        "number",
        year_level_id,
        NodeKey::Number(path.semester),
    )
    .await?;
    let (section_id, sec) =
        find_or_create_section(&mut *conn, semester_id, &path.section, path.seat_capacity).await?;

    Ok(CascadeResult {
        program_id,
        degree_id,
        branch_id,
        specialization_id,
        year_level_id,
        semester_id,
        section_id,
        created: p || d || b || s || y || sem || sec,
    })
}

pub async fn structure_rows(
    pool: &PgPool,
    institute_id: Uuid,
) -> Result<Vec<StructureRow>, AppError> {
    let rows = sqlx::query_as::<_, StructureRow>(
        r#"
        SELECT p.id AS program_id, p.level, p.name AS program,
               d.id AS degree_id, d.name AS degree,
               b.id AS branch_id, b.name AS branch,
               s.id AS specialization_id, s.name AS specialization,
               y.id AS year_level_id, y.year,
               sem.id AS semester_id, sem.number AS semester,
               sec.id AS section_id, sec.name AS section, sec.seat_capacity
        FROM tbl_programs p
        JOIN tbl_degrees d ON d.program_id = p.id
        JOIN tbl_branches b ON b.degree_id = d.id
        JOIN tbl_specializations s ON s.branch_id = b.id
        JOIN tbl_year_levels y ON y.specialization_id = s.id
        JOIN tbl_semesters sem ON sem.year_level_id = y.id
        JOIN tbl_sections sec ON sec.semester_id = sem.id
        WHERE p.institute_id = $1
        ORDER BY p.level, p.name, p.id, d.name, b.name, s.name, y.year, sem.number, sec.name
        "#,
    )
    .bind(institute_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_programs(
    pool: &PgPool,
    institute_id: Uuid,
    level: Option<ProgramLevel>,
) -> Result<Vec<Program>, AppError> {
    let programs = sqlx::query_as::<_, Program>(
        r#"
        SELECT * FROM tbl_programs
        WHERE institute_id = $1 AND ($2::TEXT IS NULL OR level = $2)
        ORDER BY level, name
        "#,
    )
    .bind(institute_id)
    .bind(level)
    .fetch_all(pool)
    .await?;

    Ok(programs)
}

pub async fn get_program(pool: &PgPool, id: Uuid) -> Result<Program, AppError> {
    sqlx::query_as::<_, Program>("SELECT * FROM tbl_programs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Program not found"))
}

/// Renaming onto an existing (level, name) pair is a 409 through the unique index.
pub async fn update_program(
    pool: &PgPool,
    id: Uuid,
    changes: &UpdateProgramRequest,
) -> Result<Program, AppError> {
    let program = sqlx::query_as::<_, Program>(
        r#"
        UPDATE tbl_programs
        SET level = COALESCE($2, level),
            name = COALESCE($3, name),
            intake = COALESCE($4, intake)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.level)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.intake)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Program not found"))?;
    Ok(program)
}

pub async fn enrolled_in_program(pool: &PgPool, program_id: Uuid) -> Result<i64, AppError> {
    let enrolled = sqlx::query_scalar("SELECT COUNT(*) FROM tbl_academics WHERE program_id = $1")
        .bind(program_id)
        .fetch_one(pool)
        .await?;
    Ok(enrolled)
}

/// Removes the program and every node below it.
#[tracing::instrument(name = "Delete program", skip(pool))]
pub async fn delete_program(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM tbl_programs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn link_student(
    conn: &mut PgConnection,
    institute_id: Uuid,
    student_id: Uuid,
    path: &CascadeResult,
    university_id: Option<&str>,
) -> Result<Academic, AppError> {
    let academic = sqlx::query_as::<_, Academic>(
        r#"
        INSERT INTO tbl_academics (
            id, student_id, institute_id, program_id, degree_id, branch_id,
            specialization_id, year_level_id, semester_id, section_id, university_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (student_id) DO UPDATE
        SET program_id = EXCLUDED.program_id,
            degree_id = EXCLUDED.degree_id,
            branch_id = EXCLUDED.branch_id,
            specialization_id = EXCLUDED.specialization_id,
            year_level_id = EXCLUDED.year_level_id,
            semester_id = EXCLUDED.semester_id,
            section_id = EXCLUDED.section_id,
            university_id = COALESCE(EXCLUDED.university_id, tbl_academics.university_id),
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(institute_id)
    .bind(path.program_id)
    .bind(path.degree_id)
    .bind(path.branch_id)
    .bind(path.specialization_id)
    .bind(path.year_level_id)
    .bind(path.semester_id)
    .bind(path.section_id)
    .bind(university_id)
    .fetch_one(conn)
    .await?;

    Ok(academic)
}

pub async fn academic_details(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<AcademicDetails, AppError> {
    sqlx::query_as::<_, AcademicDetails>(
        r#"
        SELECT a.id, a.student_id, a.university_id, p.level,
               p.id AS program_id, p.name AS program,
               d.id AS degree_id, d.name AS degree,
               b.id AS branch_id, b.name AS branch,
               s.id AS specialization_id, s.name AS specialization,
               y.id AS year_level_id, y.year,
               sem.id AS semester_id, sem.number AS semester,
               sec.id AS section_id, sec.name AS section,
               a.updated_at
        FROM tbl_academics a
        JOIN tbl_programs p ON p.id = a.program_id
        JOIN tbl_degrees d ON d.id = a.degree_id
        JOIN tbl_branches b ON b.id = a.branch_id
        JOIN tbl_specializations s ON s.id = a.specialization_id
        JOIN tbl_year_levels y ON y.id = a.year_level_id
        JOIN tbl_semesters sem ON sem.id = a.semester_id
        JOIN tbl_sections sec ON sec.id = a.section_id
        WHERE a.student_id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("No academic record for this student"))
}
