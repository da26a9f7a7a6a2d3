//! Data models for the upload client
//!
//! Wire types use the backend's camelCase field names.

mod file;
mod upload;
mod user;

pub use file::*;
pub use upload::*;
pub use user::*;
