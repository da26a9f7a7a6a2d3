use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::UploadError;

/// Storage folders the backend issues signed upload targets for.
///
/// The wire form is the kebab-case folder name. Folders added on the backend
/// after this client was built can be addressed with [`UploadFolder::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UploadFolder {
    InstituteImages,
    Advertisements,
    ClassImages,
    SubjectImages,
    StudentImages,
    ProfileImages,
    CorrectionFiles,
    Custom(String),
}

impl UploadFolder {
    /// All folders known at build time.
    pub const KNOWN: [UploadFolder; 7] = [
        UploadFolder::InstituteImages,
        UploadFolder::Advertisements,
        UploadFolder::ClassImages,
        UploadFolder::SubjectImages,
        UploadFolder::StudentImages,
        UploadFolder::ProfileImages,
        UploadFolder::CorrectionFiles,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            UploadFolder::InstituteImages => "institute-images",
            UploadFolder::Advertisements => "advertisements",
            UploadFolder::ClassImages => "class-images",
            UploadFolder::SubjectImages => "subject-images",
            UploadFolder::StudentImages => "student-images",
            UploadFolder::ProfileImages => "profile-images",
            UploadFolder::CorrectionFiles => "correction-files",
            UploadFolder::Custom(name) => name,
        }
    }

    /// Build a folder not in the known list. The name becomes the first segment
    /// of the storage key, so path separators and `..` are rejected.
    pub fn custom(name: &str) -> Result<Self, UploadError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UploadError::InvalidInput(
                "Folder name must not be empty".to_string(),
            ));
        }
        if name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.chars().any(char::is_whitespace)
        {
            return Err(UploadError::InvalidInput(format!(
                "Invalid folder name: {}",
                name
            )));
        }
        Ok(UploadFolder::Custom(name.to_string()))
    }
}

impl FromStr for UploadFolder {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        UploadFolder::KNOWN
            .iter()
            .find(|folder| folder.as_str() == normalized)
            .cloned()
            .map(Ok)
            .unwrap_or_else(|| UploadFolder::custom(s))
    }
}

impl Display for UploadFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for UploadFolder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UploadFolder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
