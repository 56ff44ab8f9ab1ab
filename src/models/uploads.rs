use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SignUploadRequest {
    #[validate(length(min = 1, max = 120, message = "Folder is required"))]
    pub folder: String,
}
