use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

use crate::error::UploadError;
use crate::folder::UploadFolder;
use crate::public_url::PublicUrlResolver;

/// Query for `GET /upload/get-signed-url`
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    /// Target folder; becomes the first segment of the relative path
    pub folder: UploadFolder,
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// File size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size: u64,
}

impl SignedUrlRequest {
    /// Field validation plus the configured upload size cap.
    pub fn validate_with_limit(&self, max_upload_bytes: u64) -> Result<(), UploadError> {
        self.validate()?;
        if self.content_type.parse::<mime_guess::mime::Mime>().is_err() {
            return Err(UploadError::InvalidInput(format!(
                "Invalid content type: {}",
                self.content_type
            )));
        }
        if self.file_size > max_upload_bytes {
            return Err(UploadError::InvalidInput(format!(
                "File too large: {} bytes exceeds the {} byte limit",
                self.file_size, max_upload_bytes
            )));
        }
        Ok(())
    }
}

/// Form fields the backend signed for the storage POST policy.
///
/// Kept in the order the backend sent them; they are written into the
/// multipart body in this order, ahead of the file part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyFields(Vec<(String, String)>);

impl PolicyFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PolicyFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = PolicyFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for PolicyFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PolicyFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = PolicyFields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of form field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = PolicyFields::new();
                while let Some((name, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => continue,
                        other => other.to_string(),
                    };
                    fields.insert(name, value);
                }
                Ok(fields)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(PolicyFields::new())
            }
        }

        deserializer.deserialize_any(FieldsVisitor)
    }
}

/// Response of `GET /upload/get-signed-url`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub fields: PolicyFields,
    #[serde(default)]
    pub relative_path: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
}

impl SignedUrlResponse {
    /// Turn a decoded response into a ticket, rejecting explicit failures and
    /// responses missing the upload target.
    pub fn into_ticket(self) -> Result<UploadTicket, UploadError> {
        let message = self
            .message
            .unwrap_or_else(|| "Failed to get signed URL".to_string());

        if self.success == Some(false) {
            return Err(UploadError::SignedUrl {
                status: None,
                message,
            });
        }

        let upload_url = self.upload_url.filter(|u| !u.is_empty());
        let relative_path = self.relative_path.filter(|p| !p.is_empty());
        match (upload_url, relative_path) {
            (Some(upload_url), Some(relative_path)) => Ok(UploadTicket {
                upload_url,
                fields: self.fields,
                public_url: self.public_url.unwrap_or_default(),
                relative_path,
            }),
            _ => Err(UploadError::SignedUrl {
                status: None,
                message: "Signed URL response is missing uploadUrl or relativePath".to_string(),
            }),
        }
    }
}

/// Single-use upload target issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    pub fields: PolicyFields,
    /// Not shown anywhere until verify-and-publish succeeds
    #[serde(skip_serializing)]
    pub public_url: String,
    pub relative_path: String,
}

/// Body of `POST /upload/verify-and-publish`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub relative_path: String,
}

/// Object details reported by the backend after verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Timestamps the backend formats differently are dropped rather than failing the response.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Response of `POST /upload/verify-and-publish`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub file_details: Option<FileDetails>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Publication status of an object in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStatus {
    /// Signed URL issued, bytes not yet written
    Pending,
    /// Bytes present in storage, not yet public
    Uploaded,
    /// Verified by the backend and publicly readable
    Published,
}

impl ObjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectStatus::Pending => "pending",
            ObjectStatus::Uploaded => "uploaded",
            ObjectStatus::Published => "published",
        }
    }
}

/// An object addressed by its backend-assigned relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub relative_path: String,
    pub status: ObjectStatus,
}

impl StoredObject {
    pub fn pending(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            status: ObjectStatus::Pending,
        }
    }

    pub fn mark_uploaded(&mut self) -> Result<(), UploadError> {
        self.advance(ObjectStatus::Pending, ObjectStatus::Uploaded, "mark_uploaded")
    }

    pub fn mark_published(&mut self) -> Result<(), UploadError> {
        self.advance(ObjectStatus::Uploaded, ObjectStatus::Published, "mark_published")
    }

    fn advance(
        &mut self,
        expected: ObjectStatus,
        next: ObjectStatus,
        event: &'static str,
    ) -> Result<(), UploadError> {
        if self.status != expected {
            return Err(UploadError::InvalidTransition {
                from: self.status.as_str(),
                event,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Public URL for display. `None` until the object is published.
    pub fn public_url(&self, resolver: &PublicUrlResolver) -> Option<String> {
        match self.status {
            ObjectStatus::Published => Some(resolver.resolve(&self.relative_path)),
            ObjectStatus::Pending | ObjectStatus::Uploaded => None,
        }
    }
}

/// Result of a completed upload chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub relative_path: String,
    /// URL resolved locally from the storage host and relative path
    pub public_url: String,
    /// URL reported by the backend, if it sent one
    pub backend_public_url: Option<String>,
    pub file_details: Option<FileDetails>,
}
