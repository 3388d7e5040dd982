//! Backend resource types and action inputs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::http::request::MultipartBody;
use crate::session::UserProfile;

/// Validated backend resource identifier.
///
/// Parsing rejects the placeholder strings a UI produces for missing ids
/// (`""`, `undefined`, `null`) as well as anything non-numeric or zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn new(id: u64) -> Result<Self, ApiError> {
        if id == 0 {
            return Err(ApiError::InvalidId(id.to_string()));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for ResourceId {
    type Err = ApiError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
            return Err(ApiError::InvalidId(raw.to_string()));
        }
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| ApiError::InvalidId(raw.to_string()))?;
        Self::new(id).map_err(|_| ApiError::InvalidId(raw.to_string()))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse an identifier taken from user input.
pub fn parse_resource_id(raw: &str) -> Result<ResourceId, ApiError> {
    raw.parse()
}

/// Uploaded spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcelFile {
    pub id: ResourceId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size_in_bytes: Option<u64>,
    #[serde(default)]
    pub uploaded_by: Option<Value>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

/// Uploaded CSV sample sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFile {
    pub id: ResourceId,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<Value>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub id: Option<u64>,
    pub label: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropImage {
    pub id: ResourceId,
    #[serde(default)]
    pub sample_id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<Value>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub metadata: Vec<ImageMetadata>,
}

/// One label/value pair to attach to a crop image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: String,
    pub value: String,
}

impl FromStr for MetadataEntry {
    type Err = String;

    /// Parse `label=value`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (label, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected label=value, got '{raw}'"))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("empty metadata label in '{raw}'"));
        }
        Ok(Self {
            label: label.to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Optional filters for listing crop images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropImageFilter {
    pub csv_file: Option<ResourceId>,
    pub sample_id: Option<String>,
    pub metadata_label: Option<String>,
    pub metadata_value: Option<String>,
}

impl CropImageFilter {
    /// Query pairs for the set filters; empty values are skipped.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(csv_file) = self.csv_file {
            query.push(("csv_file".to_string(), csv_file.to_string()));
        }
        let text_filters = [
            ("sample_id", &self.sample_id),
            ("metadata_label", &self.metadata_label),
            ("metadata_value", &self.metadata_value),
        ];
        for (key, value) in text_filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key.to_string(), value.to_string()));
            }
        }
        query
    }
}

/// A titled file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub title: String,
    pub path: PathBuf,
}

impl FileUpload {
    pub fn new(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
        }
    }

    pub(crate) async fn to_multipart(&self) -> std::io::Result<MultipartBody> {
        MultipartBody::new()
            .text("title", self.title.clone())
            .file_from_path("file", &self.path)
            .await
    }
}

/// A batch of crop images to upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropImageUpload {
    pub csv_file: Option<ResourceId>,
    pub sample_id_prefix: Option<String>,
    pub images: Vec<PathBuf>,
}

impl CropImageUpload {
    pub(crate) async fn to_multipart(&self) -> std::io::Result<MultipartBody> {
        let mut body = MultipartBody::new();
        if let Some(csv_file) = self.csv_file {
            body = body.text("csv_file", csv_file.to_string());
        }
        if let Some(prefix) = &self.sample_id_prefix {
            body = body.text("sample_id_prefix", prefix.clone());
        }
        for path in &self.images {
            body = body.file_from_path("images", Path::new(path)).await?;
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: UserProfile,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What registration produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// The account is active and the session is installed.
    LoggedIn(UserProfile),
    /// The backend wants the address verified before issuing tokens.
    VerificationRequired { message: Option<String> },
}
