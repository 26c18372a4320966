use serde::{Deserialize, Serialize};

use crate::model::account::AccountCard;

/// Post lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Archived,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }

    /// Parse a status string. Unknown values return None.
    pub fn parse(s: &str) -> Option<PostStatus> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }
}

/// An authored article.
///
/// Likes, comment references, and the view counter are not part of the
/// stored record: likes and comments live in their own tables, views in
/// an integer column that is bumped atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Title, at most 200 characters.
    pub title: String,

    /// URL-safe identifier derived from the title. Globally unique.
    pub slug: String,

    /// Full body. May contain markup.
    pub content: String,

    /// Short plain-text summary, at most 300 characters.
    /// Derived from content when not supplied.
    #[serde(default)]
    pub excerpt: String,

    /// Lowercase tag set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Lowercase category.
    pub category: String,

    /// Stored-asset reference for the cover image.
    #[serde(default)]
    pub thumbnail: String,

    /// Account id of the author. Immutable after creation.
    pub author: String,

    /// Estimated reading time in minutes.
    #[serde(default = "default_read_time")]
    pub read_time: u32,

    #[serde(default)]
    pub status: PostStatus,

    #[serde(default)]
    pub featured: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,

    /// RFC 3339 timestamp of the first transition into `published`.
    /// Set once, never cleared by later status changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

fn default_read_time() -> u32 {
    1
}

/// Input for creating a new post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
}

/// Partial update for a post. Absent fields are left unchanged.
///
/// String fields that arrive as empty strings are also left unchanged,
/// matching the truthiness gate the write path has always had. `tags`
/// is the exception: an explicit empty list clears the tag set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
}

/// Full post projection returned by single-post reads and writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub category: String,
    pub thumbnail: String,
    pub author: AccountCard,
    /// Account ids that currently like this post, oldest first.
    pub likes: Vec<String>,
    pub likes_count: usize,
    /// Comment ids in creation order, replies included.
    pub comments: Vec<String>,
    pub comments_count: usize,
    pub views: u64,
    pub read_time: u32,
    pub status: PostStatus,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// List projection. Never includes the full content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub category: String,
    pub thumbnail: String,
    pub author: AccountCard,
    pub likes_count: usize,
    pub comments_count: usize,
    pub views: u64,
    pub read_time: u32,
    pub status: PostStatus,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A tag with its usage count across published posts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}
