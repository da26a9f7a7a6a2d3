use std::path::Path;

use bytes::Bytes;

use crate::error::UploadError;
use crate::folder::UploadFolder;
use crate::models::SignedUrlRequest;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file ready to be pushed through the upload chain.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    /// Build from in-memory bytes, guessing the content type from the file name.
    pub fn from_bytes(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name);
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    /// Read a file from disk. The file name is the last path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                UploadError::InvalidInput(format!("Not a file path: {}", path.display()))
            })?;

        let data = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(file_name, data))
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn signed_url_request(&self, folder: UploadFolder) -> SignedUrlRequest {
        SignedUrlRequest {
            folder,
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            file_size: self.size(),
        }
    }
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
