// src/api/auth.rs

use reqwest::Method;
use validator::Validate;

use super::{ApiClient, Auth};
use crate::error::AppError;
use crate::models::employee::{LoginRequest, LoginResponse};
use crate::normalize::decode_employee;
use crate::session::Session;

impl ApiClient {
    /// `POST /auth/login`. On success the session is initialised and
    /// persisted; on failure any previous session is left as it was.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let payload = LoginRequest::new(email, password);
        payload.validate()?;

        let body = serde_json::to_value(&payload)?;
        let mut value = self
            .send(Method::POST, &["auth", "login"], Some(body), Auth::Anonymous)
            .await?;

        let token = value
            .get("token")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Decode("login response has no token".to_string()))?;
        let employee = match value.get_mut("employee").map(serde_json::Value::take) {
            Some(raw) if raw.is_object() => decode_employee(raw)?,
            _ => return Err(AppError::Decode("login response has no employee".to_string())),
        };

        let session = Session::from_login(LoginResponse { token, employee });
        self.session.init(session.clone()).await?;
        tracing::info!(admin = session.is_admin(), "Logged in");
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.session.teardown().await
    }
}
