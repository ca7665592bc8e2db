// src/api/blogs.rs

use reqwest::Method;

use super::{ApiClient, require_id, saved_record};
use crate::error::AppError;
use crate::models::blog::{Blog, SaveBlogRequest};
use crate::normalize::{decode_blog, decode_list, unwrap_record};

impl ApiClient {
    /// `GET /blogs`. Unpublished articles are included when the backend
    /// sends them; see [`ApiClient::visible_blogs`].
    pub async fn list_blogs(&self) -> Result<Vec<Blog>, AppError> {
        let value = self.get(&["blogs"]).await?;
        decode_list(value, Some("blogs"), decode_blog)
    }

    /// Blogs the current session may see: everything for admins, published
    /// articles otherwise.
    pub async fn visible_blogs(&self) -> Result<Vec<Blog>, AppError> {
        let is_admin = self.session.is_admin().await;
        let blogs = self.list_blogs().await?;
        Ok(blogs.into_iter().filter(|b| b.visible_to(is_admin)).collect())
    }

    /// `GET /blogs/{slug}`; the backend also resolves ids here.
    pub async fn get_blog(&self, slug_or_id: &str) -> Result<Blog, AppError> {
        let key = require_id(slug_or_id, "blog")?;
        let value = self.get(&["blogs", key]).await?;
        decode_blog(unwrap_record(value, "blog"))
    }

    pub async fn create_blog(&self, payload: &SaveBlogRequest) -> Result<Option<Blog>, AppError> {
        let value = self.send_json(Method::POST, &["blogs"], payload).await?;
        tracing::info!(slug = %payload.slug, "Blog created");
        saved_record(value, "blog", decode_blog)
    }

    pub async fn update_blog(&self, id: &str, payload: &SaveBlogRequest) -> Result<Option<Blog>, AppError> {
        let id = require_id(id, "blog")?;
        let value = self.send_json(Method::PUT, &["blogs", id], payload).await?;
        tracing::info!(id, "Blog updated");
        saved_record(value, "blog", decode_blog)
    }

    pub async fn delete_blog(&self, id: &str) -> Result<(), AppError> {
        let id = require_id(id, "blog")?;
        self.delete(&["blogs", id]).await?;
        tracing::info!(id, "Blog deleted");
        Ok(())
    }

    /// `PATCH /blogs/{id}/toggle`: flips `published` server-side.
    pub async fn toggle_blog(&self, id: &str) -> Result<Option<Blog>, AppError> {
        let id = require_id(id, "blog")?;
        let value = self
            .send_json(Method::PATCH, &["blogs", id, "toggle"], &serde_json::json!({}))
            .await?;
        saved_record(value, "blog", decode_blog)
    }
}
