// src/session.rs

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::AppError;
use crate::models::employee::{Employee, LoginResponse, bool_like};
use crate::utils::jwt;

/// What survives between runs: the bearer token, the admin flag and the
/// profile returned by login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default, deserialize_with = "bool_like")]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Employee>,
}

impl Session {
    pub fn from_login(response: LoginResponse) -> Self {
        Self {
            token: response.token,
            is_admin: response.employee.is_admin,
            role: response.employee.role.clone(),
            profile: Some(response.employee),
        }
    }

    /// Admin if any of the stored flag, the profile flag or an "admin" role
    /// says so.
    pub fn is_admin(&self) -> bool {
        let role_is_admin = self
            .role
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("admin"));
        self.is_admin
            || role_is_admin
            || self
                .profile
                .as_ref()
                .is_some_and(|p| p.is_admin || p.has_admin_role())
    }
}

/// Persistence for the session between process runs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, AppError>;
    async fn save(&self, session: &Session) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// JSON file on disk. A missing file is "logged out"; an unreadable one is
/// reported and treated the same.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Session>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring corrupt session file: {}", e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, AppError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), AppError> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

/// The one piece of shared mutable state: the live session, injected into
/// the API client and the screen handlers.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: Arc::new(RwLock::new(None)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// Loads the persisted session. An already expired token is discarded.
    /// Returns whether a usable session is now active.
    pub async fn restore(&self) -> Result<bool, AppError> {
        let Some(session) = self.store.load().await? else {
            return Ok(false);
        };
        if jwt::is_expired(&session.token, jwt::now_secs()) {
            tracing::info!("Stored session has expired");
            self.teardown().await?;
            return Ok(false);
        }
        *self.current.write().await = Some(session);
        Ok(true)
    }

    pub async fn init(&self, session: Session) -> Result<(), AppError> {
        self.store.save(&session).await?;
        *self.current.write().await = Some(session);
        tracing::info!("Session started");
        Ok(())
    }

    pub async fn teardown(&self) -> Result<(), AppError> {
        let had_session = self.current.write().await.take().is_some();
        self.store.clear().await?;
        if had_session {
            tracing::info!("Session ended");
        }
        Ok(())
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The token to attach to an authenticated request.
    ///
    /// Fails with [`AppError::AuthError`] when there is no session or the
    /// token's `exp` has passed; an expired session is torn down first.
    pub async fn bearer(&self) -> Result<String, AppError> {
        let token = match self.current.read().await.as_ref() {
            Some(session) => session.token.clone(),
            None => return Err(AppError::AuthError("Please log in".to_string())),
        };
        if jwt::is_expired(&token, jwt::now_secs()) {
            if let Err(e) = self.teardown().await {
                tracing::warn!("Failed to clear expired session: {}", e);
            }
            return Err(AppError::AuthError("Session expired, please log in again".to_string()));
        }
        Ok(token)
    }

    pub async fn is_admin(&self) -> bool {
        self.current.read().await.as_ref().is_some_and(Session::is_admin)
    }

    pub async fn profile(&self) -> Option<Employee> {
        self.current
            .read()
            .await
            .as_ref()
            .and_then(|s| s.profile.clone())
    }
}
