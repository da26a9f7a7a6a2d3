//! Session context
//!
//! The signed-in user, their access token and the console selections
//! (institute, class, child, organization) travel together in a [`Session`]
//! that callers own and pass down. Only `&mut Session` can change them.
//! Tokens are persisted through a [`TokenStore`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{CurrentUser, Selection};

/// What a [`TokenStore`] persists between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<CurrentUser>,
}

/// Persistence for the access token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredToken>>;

    fn save(&self, token: &StoredToken) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Stores the token as JSON in a file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read token file: {}", self.path.display())
                })
            }
        };

        let token = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse token file: {}", self.path.display()))?;
        Ok(Some(token))
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token directory: {}", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(token).context("Serialize token")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "Persisted access token");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove token file: {}", self.path.display())
            }),
        }
    }
}

/// In-memory token store, for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        let guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    user: Option<CurrentUser>,
    institute: Option<Selection>,
    class: Option<Selection>,
    child: Option<Selection>,
    organization: Option<Selection>,
}

impl Session {
    /// A session with no token; requests are sent without `Authorization`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Restore the token (and user, if stored) from a store.
    pub fn restore(store: &dyn TokenStore) -> Result<Self> {
        Ok(match store.load()? {
            Some(stored) => Self {
                access_token: Some(stored.access_token),
                user: stored.user,
                ..Self::default()
            },
            None => Self::anonymous(),
        })
    }

    pub fn sign_in(&mut self, access_token: impl Into<String>, user: Option<CurrentUser>) {
        *self = Self {
            access_token: Some(access_token.into()),
            user,
            ..Self::default()
        };
    }

    /// Persist the current token. Anonymous sessions clear the store.
    pub fn persist(&self, store: &dyn TokenStore) -> Result<()> {
        match &self.access_token {
            Some(token) => store.save(&StoredToken {
                access_token: token.clone(),
                user: self.user.clone(),
            }),
            None => store.clear(),
        }
    }

    /// Drop the token, user and all selections, and clear the store.
    pub fn sign_out(&mut self, store: &dyn TokenStore) -> Result<()> {
        *self = Self::anonymous();
        store.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Token for the `Authorization: Bearer` header, if signed in.
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    pub fn institute(&self) -> Option<&Selection> {
        self.institute.as_ref()
    }

    pub fn class(&self) -> Option<&Selection> {
        self.class.as_ref()
    }

    pub fn child(&self) -> Option<&Selection> {
        self.child.as_ref()
    }

    pub fn organization(&self) -> Option<&Selection> {
        self.organization.as_ref()
    }

    /// Switching institute invalidates the class picked under the previous one.
    pub fn select_institute(&mut self, institute: Option<Selection>) {
        if self.institute != institute {
            self.class = None;
        }
        self.institute = institute;
    }

    /// A class can only be selected within a selected institute.
    pub fn select_class(&mut self, class: Option<Selection>) -> Result<()> {
        if class.is_some() && self.institute.is_none() {
            return Err(anyhow::anyhow!(
                "Select an institute before selecting a class"
            ));
        }
        self.class = class;
        Ok(())
    }

    pub fn select_child(&mut self, child: Option<Selection>) {
        self.child = child;
    }

    pub fn select_organization(&mut self, organization: Option<Selection>) {
        self.organization = organization;
    }
}
