// src/lib.rs

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod report;
pub mod session;
pub mod utils;

// Re-export specific items for convenience
pub use api::ApiClient;
pub use error::AppError;
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionContext, SessionStore};
