use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::upload_signer::UploadSigner;
use crate::core::{AppError, AppSuccessResponse};
use crate::models::uploads::SignUploadRequest;

/// Hands the client a short-lived signature for a direct upload into the
/// caller's institute folder.
#[tracing::instrument(name = "Sign upload", skip(signer, auth))]
#[post("/sign")]
pub async fn sign_upload(
    signer: web::Data<UploadSigner>,
    auth: JwtMiddleware,
    request: web::Json<SignUploadRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let institute_id = auth.claims.institute()?;

    let signed = signer
        .sign(institute_id, &request.folder, Utc::now().timestamp())
        .map_err(AppError::validation_error)?;

    tracing::info!(user_id = %auth.user_id, folder = %signed.folder, "upload signed");

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        signed,
        "Upload signature generated",
    )))
}
