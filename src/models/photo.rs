use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::datetime::parse_datetime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub filename: String,
    pub size: u64,
    #[serde(default)]
    pub acquisition_date: Option<String>,
    #[serde(default)]
    pub dominant_color: Option<String>,
    #[serde(default)]
    pub album_id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: String,
}

/// Multipart payload for `POST /albums/:id/photos`.
#[derive(Debug, Clone, Validate)]
pub struct NewPhoto {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_acquisition_date"))]
    pub acquisition_date: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhotoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_acquisition_date"))]
    pub acquisition_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct DeletePhotosRequest {
    #[validate(length(min = 1, message = "Select at least one photo"))]
    pub ids: Vec<String>,
}

pub fn validate_acquisition_date(value: &str) -> Result<(), ValidationError> {
    if parse_datetime(value).is_some() {
        return Ok(());
    }
    let mut error = ValidationError::new("acquisition_date");
    error.message = Some(format!("Unrecognized date: {}", value).into());
    Err(error)
}
