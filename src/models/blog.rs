// src/models/blog.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::employee::Employee;

/// Represents a blog article as the client holds it after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub meta_title: String,

    #[serde(default)]
    pub meta_description: String,

    #[serde(default)]
    pub meta_keywords: Vec<String>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Stored order as received; use [`Blog::sorted_blocks`] for display.
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,

    #[serde(default)]
    pub published: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Blog {
    pub fn sorted_blocks(&self) -> Vec<&ContentBlock> {
        sorted_blocks(&self.content_blocks)
    }

    /// Non-admins only ever see published articles.
    pub fn visible_to(&self, is_admin: bool) -> bool {
        is_admin || self.published
    }
}

pub fn sorted_blocks(blocks: &[ContentBlock]) -> Vec<&ContentBlock> {
    let mut sorted: Vec<&ContentBlock> = blocks.iter().collect();
    sorted.sort_by_key(|b| b.order);
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    Paragraph,
    Quote,
    Code,
    Image,
    List,
    Link,
}

impl BlockKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heading" => Some(BlockKind::Heading),
            "paragraph" => Some(BlockKind::Paragraph),
            "quote" => Some(BlockKind::Quote),
            "code" => Some(BlockKind::Code),
            "image" => Some(BlockKind::Image),
            "list" => Some(BlockKind::List),
            "link" => Some(BlockKind::Link),
            _ => None,
        }
    }
}

/// One typed unit of article content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(default)]
    pub content: String,

    /// Image source or link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Code blocks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Heading level, "h1".."h6".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// 1-based display position.
    #[serde(default)]
    pub order: u32,
}

impl ContentBlock {
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            url: None,
            language: None,
            level: (kind == BlockKind::Heading).then(|| DEFAULT_HEADING_LEVEL.to_string()),
            order: 0,
        }
    }
}

pub const DEFAULT_HEADING_LEVEL: &str = "h1";
pub const DEFAULT_CATEGORY: &str = "Technology";

/// A blog's author once the normalizer has looked at it.
///
/// `name` is `None` when the server sent an unresolved reference (a bare id,
/// or a name that is itself an id). Display code fills the gap with
/// [`Author::display_name`]; the record is never corrected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl Author {
    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// Name to render. Unresolved authors fall back to the signed-in user's
    /// profile, for display only.
    pub fn display_name(author: Option<&Author>, profile: Option<&Employee>) -> String {
        if let Some(name) = author.and_then(|a| a.name.as_deref()) {
            return name.to_string();
        }
        match profile {
            Some(p) => p.display_name().unwrap_or("Current User").to_string(),
            None => "Unknown Author".to_string(),
        }
    }
}

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9 -]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// URL slug from a title: lowercase ASCII letters, digits and single dashes.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(&lower, "");
    let dashed = WHITESPACE.replace_all(kept.trim(), "-");
    DASH_RUNS
        .replace_all(&dashed, "-")
        .trim_matches('-')
        .to_string()
}

/// Edit buffer behind the blog create/edit dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogForm {
    pub title: String,
    pub slug: String,
    pub meta_title: String,
    pub meta_description: String,
    pub meta_keywords: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub content_blocks: Vec<ContentBlock>,
    pub published: bool,
    pub cover_image: Option<String>,
}

impl Default for BlogForm {
    fn default() -> Self {
        Self::new()
    }
}

impl BlogForm {
    /// Starts with one empty heading block.
    pub fn new() -> Self {
        let mut form = Self {
            title: String::new(),
            slug: String::new(),
            meta_title: String::new(),
            meta_description: String::new(),
            meta_keywords: Vec::new(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            content_blocks: Vec::new(),
            published: false,
            cover_image: None,
        };
        form.add_block(ContentBlock::new(BlockKind::Heading, ""));
        form
    }

    pub fn from_blog(blog: &Blog) -> Self {
        let mut content_blocks: Vec<ContentBlock> =
            blog.sorted_blocks().into_iter().cloned().collect();
        if content_blocks.is_empty() {
            content_blocks.push(ContentBlock {
                order: 1,
                ..ContentBlock::new(BlockKind::Heading, "")
            });
        }
        Self {
            title: blog.title.clone(),
            slug: blog.slug.clone(),
            meta_title: blog.meta_title.clone(),
            meta_description: blog.meta_description.clone(),
            meta_keywords: blog.meta_keywords.clone(),
            category: blog.category.clone(),
            tags: blog.tags.clone(),
            content_blocks,
            published: blog.published,
            cover_image: blog.cover_image.clone(),
        }
    }

    /// Appends a block at the next position.
    pub fn add_block(&mut self, mut block: ContentBlock) {
        block.order = self.content_blocks.len() as u32 + 1;
        if block.kind == BlockKind::Heading && block.level.is_none() {
            block.level = Some(DEFAULT_HEADING_LEVEL.to_string());
        }
        self.content_blocks.push(block);
    }

    /// Removes a block and renumbers the rest 1..n.
    pub fn remove_block(&mut self, index: usize) {
        if index >= self.content_blocks.len() {
            return;
        }
        self.content_blocks.remove(index);
        for (i, block) in self.content_blocks.iter_mut().enumerate() {
            block.order = i as u32 + 1;
        }
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        push_unique(&mut self.tags, tag)
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }

    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        push_unique(&mut self.meta_keywords, keyword)
    }

    pub fn remove_keyword(&mut self, keyword: &str) {
        self.meta_keywords.retain(|k| k != keyword);
    }

    pub fn to_request(&self) -> Result<SaveBlogRequest, AppError> {
        let mut blocks: Vec<ContentBlock> = self
            .content_blocks
            .iter()
            .enumerate()
            .map(|(idx, b)| {
                let mut block = b.clone();
                if block.order == 0 {
                    block.order = idx as u32 + 1;
                }
                if block.kind == BlockKind::Heading && block.level.is_none() {
                    block.level = Some(DEFAULT_HEADING_LEVEL.to_string());
                }
                block.url = block.url.filter(|u| !u.trim().is_empty());
                block.language = block.language.filter(|l| !l.trim().is_empty());
                block
            })
            .collect();
        blocks.sort_by_key(|b| b.order);

        let slug = if self.slug.trim().is_empty() {
            slugify(&self.title)
        } else {
            self.slug.trim().to_string()
        };

        let request = SaveBlogRequest {
            title: self.title.trim().to_string(),
            slug,
            meta_title: self.meta_title.clone(),
            meta_description: self.meta_description.clone(),
            meta_keywords: self.meta_keywords.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            content_blocks: blocks,
            published: self.published,
            cover_image: self.cover_image.clone(),
        };
        request.validate()?;
        Ok(request)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

/// Body of `POST /blogs` and `PUT /blogs/{id}`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveBlogRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, max = 200, message = "Slug is required"))]
    pub slug: String,

    pub meta_title: String,

    #[validate(length(max = 500))]
    pub meta_description: String,

    pub meta_keywords: Vec<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    pub tags: Vec<String>,

    pub content_blocks: Vec<ContentBlock>,

    pub published: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}
