use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::non_blank;

pub const DEFAULT_SPECIALIZATION: &str = "General";
pub const DEFAULT_SEAT_CAPACITY: i32 = 60;

text_enum! {
    pub enum ProgramLevel {
        Ug => "UG",
        Pg => "PG",
        Diploma => "Diploma",
        PhD => "PhD",
        Certification => "Certification",
    }
}

/// One row of the institute's academic structure, top to bottom.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AcademicPath {
    pub level: ProgramLevel,
    #[validate(length(min = 1, max = 120, message = "Program name is required"))]
    pub program: String,
    #[validate(length(min = 1, max = 120, message = "Degree name is required"))]
    pub degree: String,
    #[validate(length(min = 1, max = 120, message = "Branch name is required"))]
    pub branch: String,
    pub specialization: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Year must be between 1 and 10"))]
    pub year: i32,
    #[validate(range(min = 1, max = 20, message = "Semester must be between 1 and 20"))]
    pub semester: i32,
    #[validate(length(min = 1, max = 20, message = "Section name is required"))]
    pub section: String,
    #[validate(range(min = 1, max = 1000, message = "Seat capacity must be between 1 and 1000"))]
    pub seat_capacity: Option<i32>,
}

impl AcademicPath {
    /// Trimmed names with the default specialization applied.
    pub fn normalized(&self) -> AcademicPath {
        let specialization = self
            .specialization
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SPECIALIZATION)
            .to_string();

        AcademicPath {
            level: self.level,
            program: self.program.trim().to_string(),
            degree: self.degree.trim().to_string(),
            branch: self.branch.trim().to_string(),
            specialization: Some(specialization),
            year: self.year,
            semester: self.semester,
            section: self.section.trim().to_uppercase(),
            seat_capacity: self.seat_capacity,
        }
    }

    pub fn specialization_name(&self) -> &str {
        self.specialization
            .as_deref()
            .unwrap_or(DEFAULT_SPECIALIZATION)
    }

    pub fn check_names(&self) -> Result<(), String> {
        let blank = [
            ("program", &self.program),
            ("degree", &self.degree),
            ("branch", &self.branch),
            ("section", &self.section),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());

        match blank {
            Some((field, _)) => Err(format!("{field} must not be blank")),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CascadeResult {
    pub program_id: Uuid,
    pub degree_id: Uuid,
    pub branch_id: Uuid,
    pub specialization_id: Uuid,
    pub year_level_id: Uuid,
    pub semester_id: Uuid,
    pub section_id: Uuid,
    /// Whether any node was inserted.
    pub created: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkStructureRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 rows are accepted"))]
    pub rows: Vec<AcademicPath>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Program {
    pub id: Uuid,
    pub institute_id: Uuid,
    pub level: ProgramLevel,
    pub name: String,
    pub intake: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProgramRequest {
    pub level: Option<ProgramLevel>,
    #[validate(length(min = 1, max = 120, message = "Program name is required"), custom = "non_blank")]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "Intake must be at least 1"))]
    pub intake: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IntakeRequest {
    #[validate(range(min = 1, max = 100000, message = "Intake must be at least 1"))]
    pub intake: i32,
}

#[derive(Debug, Deserialize)]
pub struct ProgramQuery {
    pub level: Option<ProgramLevel>,
}

/// Flat join of one section with all of its ancestors.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StructureRow {
    pub program_id: Uuid,
    pub level: ProgramLevel,
    pub program: String,
    pub degree_id: Uuid,
    pub degree: String,
    pub branch_id: Uuid,
    pub branch: String,
    pub specialization_id: Uuid,
    pub specialization: String,
    pub year_level_id: Uuid,
    pub year: i32,
    pub semester_id: Uuid,
    pub semester: i32,
    pub section_id: Uuid,
    pub section: String,
    pub seat_capacity: i32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SectionNode {
    pub id: Uuid,
    pub name: String,
    pub seat_capacity: i32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SemesterNode {
    pub id: Uuid,
    pub number: i32,
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct YearLevelNode {
    pub id: Uuid,
    pub year: i32,
    pub semesters: Vec<SemesterNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SpecializationNode {
    pub id: Uuid,
    pub name: String,
    pub years: Vec<YearLevelNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BranchNode {
    pub id: Uuid,
    pub name: String,
    pub specializations: Vec<SpecializationNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DegreeNode {
    pub id: Uuid,
    pub name: String,
    pub branches: Vec<BranchNode>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ProgramNode {
    pub id: Uuid,
    pub level: ProgramLevel,
    pub name: String,
    pub degrees: Vec<DegreeNode>,
}

/// Folds rows ordered by program, degree, branch, specialization, year,
/// semester and section into a nested tree.
pub fn build_tree(rows: Vec<StructureRow>) -> Vec<ProgramNode> {
    let mut programs: Vec<ProgramNode> = Vec::new();

    for row in rows {
        if programs.last().map(|p| p.id) != Some(row.program_id) {
            programs.push(ProgramNode {
                id: row.program_id,
                level: row.level,
                name: row.program.clone(),
                degrees: Vec::new(),
            });
        }
        let Some(program) = programs.last_mut() else {
            continue;
        };

        if program.degrees.last().map(|d| d.id) != Some(row.degree_id) {
            program.degrees.push(DegreeNode {
                id: row.degree_id,
                name: row.degree.clone(),
                branches: Vec::new(),
            });
        }
        let Some(degree) = program.degrees.last_mut() else {
            continue;
        };

        if degree.branches.last().map(|b| b.id) != Some(row.branch_id) {
            degree.branches.push(BranchNode {
                id: row.branch_id,
                name: row.branch.clone(),
                specializations: Vec::new(),
            });
        }
        let Some(branch) = degree.branches.last_mut() else {
            continue;
        };

        if branch.specializations.last().map(|s| s.id) != Some(row.specialization_id) {
            branch.specializations.push(SpecializationNode {
                id: row.specialization_id,
                name: row.specialization.clone(),
                years: Vec::new(),
            });
        }
        let Some(specialization) = branch.specializations.last_mut() else {
            continue;
        };

        if specialization.years.last().map(|y| y.id) != Some(row.year_level_id) {
            specialization.years.push(YearLevelNode {
                id: row.year_level_id,
                year: row.year,
                semesters: Vec::new(),
            });
        }
        let Some(year) = specialization.years.last_mut() else {
            continue;
        };

        if year.semesters.last().map(|s| s.id) != Some(row.semester_id) {
            year.semesters.push(SemesterNode {
                id: row.semester_id,
                number: row.semester,
                sections: Vec::new(),
            });
        }
        if let Some(semester) = year.semesters.last_mut() {
            semester.sections.push(SectionNode {
                id: row.section_id,
                name: row.section,
                seat_capacity: row.seat_capacity,
            });
        }
    }

    programs
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Academic {
    pub id: Uuid,
    pub student_id: Uuid,
    pub institute_id: Uuid,
    pub program_id: Uuid,
    pub degree_id: Uuid,
    pub branch_id: Uuid,
    pub specialization_id: Uuid,
    pub year_level_id: Uuid,
    pub semester_id: Uuid,
    pub section_id: Uuid,
    pub university_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Academic record joined with the names along its path.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AcademicDetails {
    pub id: Uuid,
    pub student_id: Uuid,
    pub university_id: Option<String>,
    pub level: ProgramLevel,
    pub program_id: Uuid,
    pub program: String,
    pub degree_id: Uuid,
    pub degree: String,
    pub branch_id: Uuid,
    pub branch: String,
    pub specialization_id: Uuid,
    pub specialization: String,
    pub year_level_id: Uuid,
    pub year: i32,
    pub semester_id: Uuid,
    pub semester: i32,
    pub section_id: Uuid,
    pub section: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StudentAcademicRequest {
    #[validate]
    pub path: AcademicPath,
    #[validate(length(max = 60, message = "University id is too long"))]
    pub university_id: Option<String>,
}
