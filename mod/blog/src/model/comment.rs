use serde::{Deserialize, Serialize};

use crate::model::account::AccountCard;

/// A reader response attached to a post.
///
/// A comment with a `parent_comment` is a reply. Reply ids and like
/// ids are held in their own tables, not in the stored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Post this comment belongs to. Immutable.
    pub post_id: String,

    /// Account id of the author. Immutable.
    pub author: String,

    /// Trimmed body, 1 to 1000 characters.
    pub content: String,

    /// Parent comment id when this is a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<String>,

    #[serde(default)]
    pub is_edited: bool,

    /// RFC 3339 timestamp of the last content edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Input for creating a comment on a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub content: String,
    #[serde(default)]
    pub parent_comment: Option<String>,
}

/// Input for editing a comment's content.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComment {
    pub content: String,
}

/// Comment projection with author card, likes, and one level of replies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub author: AccountCard,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<String>,
    /// Account ids that like this comment, oldest first.
    pub likes: Vec<String>,
    pub likes_count: usize,
    /// Direct replies, oldest first. Always empty on the replies
    /// themselves; the listing surfaces exactly one level.
    pub replies: Vec<CommentView>,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_json_roundtrip() {
        let c = Comment {
            id: "c1".into(),
            post_id: "p1".into(),
            author: "u1".into(),
            content: "Nice write-up".into(),
            parent_comment: None,
            is_edited: false,
            edited_at: None,
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-01-01T00:00:00+00:00".into(),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"postId\""));
        assert!(!json.contains("parentComment"));
        let back: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn reply_keeps_parent_reference() {
        let json = r#"{"content":"agreed","parentComment":"c1"}"#;
        let input: CreateComment = serde_json::from_str(json).unwrap();
        assert_eq!(input.parent_comment.as_deref(), Some("c1"));
    }
}
