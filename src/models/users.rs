use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::jwt_auth::JwtClaims;
use crate::models::institutes::Institute;

text_enum! {
    pub enum Role {
        Admin => "admin",
        Student => "student",
        Faculty => "faculty",
    }
}

impl Role {
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Role::Admin => "ADM",
            Role::Student => "STU",
            Role::Faculty => "FAC",
        }
    }
}

text_enum! {
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_code: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub gender: Gender,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user without credentials, safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafeUser {
    pub id: Uuid,
    pub user_code: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub gender: Gender,
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for SafeUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_code: user.user_code,
            name: user.name,
            email: user.email,
            role: user.role,
            gender: user.gender,
            phone: user.phone,
            alternate_phone: user.alternate_phone,
            address: user.address,
            created_at: user.created_at,
        }
    }
}

/// Identity fields shared by every registration flow.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 2, max = 120, message = "Name must be 2 to 120 characters"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub gender: Gender,
    #[validate(length(min = 7, max = 20, message = "A valid phone number is required"))]
    pub phone: String,
    pub alternate_phone: Option<String>,
    pub address: Option<String>,
}

impl NewUser {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

/// Identity fields an admin may change on a student or faculty profile.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserFields {
    #[validate(length(min = 2, max = 120, message = "Name must be 2 to 120 characters"))]
    pub name: Option<String>,
    pub gender: Option<Gender>,
    #[validate(length(min = 7, max = 20, message = "A valid phone number is required"))]
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: SafeUser,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institute: Option<Institute>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: SafeUser,
    pub claims: JwtClaims,
}

#[derive(Debug, Deserialize)]
pub struct InstituteIdQuery {
    pub institute_id: Uuid,
}

/// `STU` + 6 random digits. Uniqueness is enforced by the database.
pub fn generate_user_code(role: Role) -> String {
    let mut rng = rand::thread_rng();
    format!("{}{:06}", role.code_prefix(), rng.gen_range(0..1_000_000))
}
