use std::path::Path;

use crate::error::{ClientError, ClientResult};
use crate::models::NewPhoto;

/// One selected file, read into memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::Validation(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(filename, bytes))
    }

    /// Filename up to the first dot, used as the title in multi-file batches.
    pub fn stem(&self) -> &str {
        self.filename.split('.').next().unwrap_or(&self.filename)
    }
}

/// Form values shared by every file of a batch.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    /// Only used when the batch holds a single file.
    pub title: String,
    pub description: Option<String>,
    pub acquisition_date: Option<String>,
}

impl UploadMetadata {
    pub fn new_photo(&self, file: UploadFile, batch_size: usize) -> NewPhoto {
        let title = if batch_size == 1 && !self.title.trim().is_empty() {
            self.title.clone()
        } else {
            file.stem().to_string()
        };

        NewPhoto {
            title,
            description: self.description.clone(),
            acquisition_date: self.acquisition_date.clone(),
            filename: file.filename,
            content_type: file.content_type,
            bytes: file.bytes,
        }
    }
}
