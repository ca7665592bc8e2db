// src/api/mod.rs

//! Typed client for the portal REST backend.
//!
//! Every request goes through [`ApiClient::send`]: it logs, attaches the
//! bearer token, turns non-2xx answers into [`AppError`] with the backend's
//! message and tears the session down on auth failures. Decoding into typed
//! records is left to [`crate::normalize`].

pub mod assignments;
pub mod auth;
pub mod blogs;
pub mod employees;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{Config, parse_base_url};
use crate::error::{AppError, ErrorBody};
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionContext) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("portal-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionContext) -> Result<Self, AppError> {
        Self::new(config.api_url.as_str(), session)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL. Segments are percent-encoded,
    /// so an id can never escape its position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("'{}' cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> Result<Value, AppError> {
        self.send(Method::GET, segments, None, Auth::Bearer).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<Value, AppError> {
        self.send(Method::DELETE, segments, None, Auth::Bearer).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<Value, AppError> {
        let body = serde_json::to_value(body)?;
        self.send(method, segments, Some(body), Auth::Bearer).await
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
        auth: Auth,
    ) -> Result<Value, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(method = %method, url = %url, "Sending API request");

        let mut request = self.http.request(method.clone(), url.clone());
        if auth == Auth::Bearer {
            let token = self.session.bearer().await?;
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(method = %method, url = %url, "Request failed: {}", e);
            AppError::from(e)
        })?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(ErrorBody::into_message);
            let err = AppError::from_status(status.as_u16(), message);
            tracing::warn!(method = %method, url = %url, status = status.as_u16(), "API error: {}", err);
            if err.requires_login() {
                if let Err(e) = self.session.teardown().await {
                    tracing::warn!("Failed to clear session after auth error: {}", e);
                }
            }
            return Err(err);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| AppError::Decode(format!("{method} {url}: {e}")))
    }
}

/// Resources are always addressed by their real id.
fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str, AppError> {
    let id = id.trim();
    if id.is_empty() {
        Err(AppError::Validation(format!("Missing {what} id")))
    } else {
        Ok(id)
    }
}

/// Save endpoints answer with the stored record, sometimes wrapped, sometimes
/// only with a message. `None` when there is no record to decode.
fn saved_record<T>(
    value: Value,
    envelope: &str,
    decode: impl Fn(Value) -> Result<T, AppError>,
) -> Result<Option<T>, AppError> {
    let value = crate::normalize::unwrap_record(value, envelope);
    let has_id = value
        .as_object()
        .is_some_and(|m| m.contains_key("_id") || m.contains_key("id"));
    if has_id { decode(value).map(Some) } else { Ok(None) }
}
