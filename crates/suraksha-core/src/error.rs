//! Error types module
//!
//! All failures of the signed upload flow are unified under [`UploadError`].
//! The three network steps each have their own variant so callers can log and
//! resume precisely, while [`ErrorMetadata::client_message`] collapses them
//! into the single user-facing message the console shows.

use std::io;

use crate::upload_state::UploadStage;

/// Message shown to the user for any failed network step.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures the caller can recover from
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be reported and presented.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether the attempt can be started again (or resumed) as-is
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user or caller
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Signed URL request failed ({}): {message}", status_label(.status))]
    SignedUrl {
        status: Option<u16>,
        message: String,
    },

    #[error("Storage upload failed ({}): {body}", status_label(.status))]
    StorageUpload { status: Option<u16>, body: String },

    #[error("Verification failed ({}): {message}", status_label(.status))]
    Verification {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid transition: cannot apply {event} in state {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no response".to_string(),
    }
}

impl UploadError {
    /// The chain step this error belongs to, if it came from one.
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            UploadError::SignedUrl { .. } => Some(UploadStage::Requesting),
            UploadError::StorageUpload { .. } => Some(UploadStage::Uploading),
            UploadError::Verification { .. } => Some(UploadStage::Verifying),
            _ => None,
        }
    }

    /// HTTP status reported by the failing endpoint, if any response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::SignedUrl { status, .. }
            | UploadError::StorageUpload { status, .. }
            | UploadError::Verification { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for UploadError {
    fn from(err: validator::ValidationErrors) -> Self {
        UploadError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn upload_error_static_metadata(
    err: &UploadError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        UploadError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the file and folder and try again"),
            LogLevel::Debug,
        ),
        UploadError::SignedUrl { .. } => (
            "SIGNED_URL_FAILED",
            true,
            Some("Sign in again or start a new upload"),
            LogLevel::Warn,
        ),
        UploadError::StorageUpload { .. } => (
            "STORAGE_UPLOAD_FAILED",
            true,
            Some("Start a new upload; the ticket cannot be reused"),
            LogLevel::Warn,
        ),
        UploadError::Verification { .. } => (
            "VERIFICATION_FAILED",
            true,
            Some("Retry verification; the file does not need to be uploaded again"),
            LogLevel::Warn,
        ),
        UploadError::InvalidTransition { .. } => (
            "INVALID_TRANSITION",
            false,
            Some("Start a new upload"),
            LogLevel::Error,
        ),
        UploadError::Io(_) => (
            "IO_ERROR",
            false,
            Some("Check that the file exists and is readable"),
            LogLevel::Warn,
        ),
        UploadError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check SURAKSHA_* environment variables"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        upload_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        upload_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::InvalidInput(msg) => msg.clone(),
            UploadError::SignedUrl { .. }
            | UploadError::StorageUpload { .. }
            | UploadError::Verification { .. }
            | UploadError::InvalidTransition { .. } => UPLOAD_FAILED_MESSAGE.to_string(),
            UploadError::Io(_) => "Could not read the selected file".to_string(),
            UploadError::Config(_) => "Client is not configured correctly".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).3
    }
}
