// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

pub const DEFAULT_SESSION_FILE: &str = ".portal-session.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the portal backend, always ending in `/`.
    pub api_url: Url,
    /// Where the session (token, admin flag, profile) is persisted between runs.
    pub session_file: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let api_url = env::var("PORTAL_API_URL")
            .map_err(|_| AppError::Config("PORTAL_API_URL must be set".to_string()))?;
        let api_url = parse_base_url(&api_url)?;

        let session_file = env::var("PORTAL_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            session_file,
            rust_log,
        })
    }
}

/// Parses a base URL and makes sure relative joins land *under* its path
/// (`http://host/api` + `assignments` must give `http://host/api/assignments`).
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Config("base URL is empty".to_string()));
    }
    let mut url = Url::parse(trimmed)?;
    if url.cannot_be_a_base() {
        return Err(AppError::Config(format!("'{trimmed}' cannot be used as a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
