use actix_web::dev::Payload;
use actix_web::{http, web, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::users::Role;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JwtClaims {
    pub sub: Uuid, // user id
    pub user_code: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub institute_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn institute(&self) -> Result<Uuid, AppError> {
        self.institute_id
            .ok_or_else(|| AppError::forbidden_error("Your account is not linked to an institute"))
    }

    pub fn student(&self) -> Result<Uuid, AppError> {
        match (self.role, self.student_id) {
            (Role::Student, Some(id)) => Ok(id),
            _ => Err(AppError::forbidden_error(
                "Only students can perform this action",
            )),
        }
    }

    pub fn faculty(&self) -> Result<Uuid, AppError> {
        match (self.role, self.faculty_id) {
            (Role::Faculty, Some(id)) => Ok(id),
            _ => Err(AppError::forbidden_error(
                "Only faculty can perform this action",
            )),
        }
    }

    pub fn require_admin(&self) -> Result<Uuid, AppError> {
        if self.role != Role::Admin {
            return Err(AppError::forbidden_error(
                "Only institute admins can perform this action",
            ));
        }
        self.institute()
    }

    /// Faculty or admin, returning the institute they review for.
    pub fn require_reviewer(&self) -> Result<Uuid, AppError> {
        if !matches!(self.role, Role::Admin | Role::Faculty) {
            return Err(AppError::forbidden_error(
                "Only faculty or admins can perform this action",
            ));
        }
        self.institute()
    }
}

/// Identity fields used to mint a token.
pub struct TokenSubject {
    pub user_id: Uuid,
    pub user_code: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub institute_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct JwtKeys {
    secret: Secret<String>,
    expiration_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: Secret<String>, expiration_hours: i64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    pub fn claims_for(&self, subject: TokenSubject) -> JwtClaims {
        let now = Utc::now().timestamp();
        let (admin_id, student_id, faculty_id) = match subject.role {
            Role::Admin => (subject.profile_id, None, None),
            Role::Student => (None, subject.profile_id, None),
            Role::Faculty => (None, None, subject.profile_id),
        };

        JwtClaims {
            sub: subject.user_id,
            user_code: subject.user_code,
            email: subject.email,
            name: subject.name,
            role: subject.role,
            institute_id: subject.institute_id,
            admin_id,
            student_id,
            faculty_id,
            iat: now,
            exp: now + self.expiration_hours * 3600,
        }
    }

    pub fn generate(&self, claims: &JwtClaims) -> Result<String, AppError> {
        let encoding_key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());

        encode(&Header::default(), claims, &encoding_key)
            .map_err(|_| AppError::internal_error("Failed to generate JWT token"))
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AppError> {
        let decoding_key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        decode::<JwtClaims>(token, &decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::unauthorized("Invalid token"))
    }
}

#[derive(Debug)]
pub struct JwtMiddleware {
    pub user_id: Uuid,
    pub claims: JwtClaims,
}

pub(crate) fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<JwtMiddleware, AppError> {
    let keys = req
        .app_data::<web::Data<JwtKeys>>()
        .ok_or_else(|| AppError::internal_error("JWT keys are not configured"))?;

    let token =
        bearer_token(req).ok_or_else(|| AppError::unauthorized("Invalid login credentials"))?;
    let claims = keys.verify(&token)?;

    req.extensions_mut().insert(claims.clone());

    Ok(JwtMiddleware {
        user_id: claims.sub,
        claims,
    })
}

impl FromRequest for JwtMiddleware {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
