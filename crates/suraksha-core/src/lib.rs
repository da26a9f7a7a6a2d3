//! Suraksha Core Library
//!
//! This crate provides the domain models, error types, configuration, session
//! context and upload state machine shared by the Suraksha API client and CLI.

pub mod config;
pub mod error;
pub mod folder;
pub mod models;
pub mod public_url;
pub mod session;
pub mod upload_state;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorMetadata, LogLevel, UploadError, UploadResult};
pub use folder::UploadFolder;
pub use public_url::PublicUrlResolver;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use upload_state::{UploadStage, UploadState};
