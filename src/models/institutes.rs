use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::users::NewUser;

text_enum! {
    pub enum InstituteType {
        Private => "private",
        Government => "government",
        Autonomous => "autonomous",
        Deemed => "deemed",
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct Institute {
    pub id: Uuid,
    pub name: String,
    pub institute_type: InstituteType,
    pub official_email: String,
    pub official_phone: String,
    pub address_line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_affiliated: bool,
    pub affiliation_university: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry in the public institute directory.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InstituteSummary {
    pub id: Uuid,
    pub name: String,
    pub institute_type: InstituteType,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewInstitute {
    #[validate(length(min = 2, max = 200, message = "Institute name is required"))]
    pub name: String,
    pub institute_type: InstituteType,
    #[validate(email(message = "A valid official email is required"))]
    pub official_email: String,
    #[validate(length(min = 7, max = 20, message = "A valid official phone is required"))]
    pub official_phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address_line1: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 4, max = 10, message = "A valid pincode is required"))]
    pub pincode: String,
    #[serde(default)]
    pub is_affiliated: bool,
    pub affiliation_university: Option<String>,
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
}

impl NewInstitute {
    pub fn check_affiliation(&self) -> Result<(), String> {
        let university = self
            .affiliation_university
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if self.is_affiliated && university.is_empty() {
            return Err("Affiliated institutes must name their affiliation university".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInstituteRequest {
    #[validate]
    pub institute: NewInstitute,
    #[validate]
    pub admin: NewUser,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInstituteRequest {
    #[validate(length(min = 2, max = 200, message = "Institute name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 7, max = 20, message = "A valid official phone is required"))]
    pub official_phone: Option<String>,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub is_affiliated: Option<bool>,
    pub affiliation_university: Option<String>,
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
}

impl UpdateInstituteRequest {
    /// Affiliation rule checked against the stored institute the update lands on.
    pub fn check_affiliation(&self, current: &Institute) -> Result<(), String> {
        let is_affiliated = self.is_affiliated.unwrap_or(current.is_affiliated);
        let university = self
            .affiliation_university
            .as_deref()
            .or(current.affiliation_university.as_deref())
            .map(str::trim)
            .unwrap_or_default();
        if is_affiliated && university.is_empty() {
            return Err("Affiliated institutes must name their affiliation university".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct InstituteQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
