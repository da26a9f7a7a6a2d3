use serde::{Deserialize, Serialize};

/// The signed-in console user, as returned by the backend on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Backend role name (e.g. "SUPERADMIN", "INSTITUTE_ADMIN", "TEACHER")
    pub role: String,
}

/// An entity picked in the console's selectors (institute, class, child, organization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    pub name: String,
}

impl Selection {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
