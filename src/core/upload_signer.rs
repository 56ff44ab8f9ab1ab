use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::core::config::UploadConfig;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignError {
    #[error("folder is required")]
    MissingFolder,
    #[error("folder `{0}` is not allowed")]
    InvalidFolder(String),
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SignedUpload {
    pub timestamp: i64,
    pub signature: String,
    pub signature_algorithm: &'static str,
    pub api_key: String,
    pub cloud_name: String,
    pub folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eager: Option<String>,
}

#[derive(Clone)]
pub struct UploadSigner {
    cloud_name: String,
    api_key: String,
    api_secret: Secret<String>,
    eager: Option<String>,
    root_folder: String,
}

impl UploadSigner {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            eager: config.eager.clone().filter(|e| !e.trim().is_empty()),
            root_folder: config.root_folder.trim_matches('/').to_string(),
        }
    }

    /// `{root}/{institute}/{folder}` with the caller's folder sanitized.
    pub fn scoped_folder(&self, institute_id: Uuid, folder: &str) -> Result<String, SignError> {
        let folder = folder.trim().trim_matches('/');
        if folder.is_empty() {
            return Err(SignError::MissingFolder);
        }
        let allowed = folder.split('/').all(|segment| {
            !segment.is_empty()
                && segment != ".."
                && segment != "."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        });
        if !allowed {
            return Err(SignError::InvalidFolder(folder.to_string()));
        }

        Ok(format!("{}/{}/{}", self.root_folder, institute_id, folder))
    }

    pub fn sign(
        &self,
        institute_id: Uuid,
        folder: &str,
        timestamp: i64,
    ) -> Result<SignedUpload, SignError> {
        let folder = self.scoped_folder(institute_id, folder)?;

        let mut params = BTreeMap::new();
        params.insert("folder", folder.clone());
        params.insert("timestamp", timestamp.to_string());
        if let Some(eager) = &self.eager {
            params.insert("eager", eager.clone());
        }

        Ok(SignedUpload {
            timestamp,
            signature: signature(&params, self.api_secret.expose_secret()),
            signature_algorithm: "sha256",
            api_key: self.api_key.clone(),
            cloud_name: self.cloud_name.clone(),
            folder,
            eager: self.eager.clone(),
        })
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` (keys sorted, empty values skipped) followed by the secret.
pub fn signature(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
