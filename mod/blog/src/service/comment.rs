use std::collections::HashMap;

use byline_core::{Actor, PageParams, Pagination, ServiceError, new_id, now_rfc3339};
use byline_sql::Value;

use crate::model::{AccountCard, Comment, CommentView, CreateComment, Post, UpdateComment};
use crate::service::{BlogService, storage_error};

const COMMENT_MAX: usize = 1000;

/// Trim and bounds-check comment content. Runs before any lookup so a
/// bad body is always a validation error, never a not-found.
fn validate_content(content: &str) -> Result<String, ServiceError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(
            "comment content cannot be empty".into(),
        ));
    }
    if trimmed.chars().count() > COMMENT_MAX {
        return Err(ServiceError::Validation(format!(
            "comment cannot exceed {} characters",
            COMMENT_MAX
        )));
    }
    Ok(trimmed.to_string())
}

fn comment_index_values(comment: &Comment) -> Vec<(&'static str, Value)> {
    vec![
        ("post_id", Value::Text(comment.post_id.clone())),
        ("author", Value::Text(comment.author.clone())),
        (
            "parent_comment",
            match &comment.parent_comment {
                Some(p) => Value::Text(p.clone()),
                None => Value::Null,
            },
        ),
        ("created_at", Value::Text(comment.created_at.clone())),
    ]
}

impl BlogService {
    /// Comment on a post. A `parent_comment` makes this a reply; the
    /// parent only has to exist, replies to replies are stored as-is
    /// and surface one level deep.
    pub fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        input: CreateComment,
    ) -> Result<CommentView, ServiceError> {
        let content = validate_content(&input.content)?;

        let _: Post = self.get_record("posts", post_id)?;
        if let Some(parent_id) = &input.parent_comment {
            let _: Comment = self.get_record("comments", parent_id)?;
        }
        let author = self.account_card(author_id)?;

        let now = now_rfc3339();
        let comment = Comment {
            id: new_id(),
            post_id: post_id.to_string(),
            author: author.id.clone(),
            content,
            parent_comment: input.parent_comment,
            is_edited: false,
            edited_at: None,
            created_at: now.clone(),
            updated_at: now,
        };
        let indexes = comment_index_values(&comment);
        self.insert_record("comments", &comment.id, &comment, &indexes)?;

        Ok(CommentView {
            id: comment.id,
            post_id: comment.post_id,
            author,
            content: comment.content,
            parent_comment: comment.parent_comment,
            likes: Vec::new(),
            likes_count: 0,
            replies: Vec::new(),
            is_edited: false,
            edited_at: None,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    /// Top-level comments for a post, newest first, each carrying its
    /// replies oldest first. A post with no comments (or no post at
    /// all) yields an empty page.
    pub fn list_comments(
        &self,
        post_id: &str,
        page: PageParams,
    ) -> Result<(Vec<CommentView>, Pagination), ServiceError> {
        let page = page.normalize();

        let count_rows = self.sql
            .query(
                "SELECT COUNT(*) as cnt FROM comments \
                 WHERE post_id = ?1 AND parent_comment IS NULL",
                &[Value::Text(post_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let rows = self.sql
            .query(
                "SELECT data FROM comments \
                 WHERE post_id = ?1 AND parent_comment IS NULL \
                 ORDER BY created_at DESC, id ASC LIMIT ?2 OFFSET ?3",
                &[
                    Value::Text(post_id.to_string()),
                    Value::Integer(page.limit as i64),
                    Value::Integer(page.offset() as i64),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut authors = HashMap::new();
        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            let comment: Comment = serde_json::from_str(data)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            let replies = self.comment_replies(&comment.id, &mut authors)?;
            comments.push(self.assemble_view(comment, replies, &mut authors)?);
        }

        Ok((comments, Pagination::new(page.page, page.limit, total)))
    }

    /// Edit a comment's content. Only the author may edit; admins get
    /// no bypass here.
    pub fn update_comment(
        &self,
        id: &str,
        actor: &Actor,
        input: UpdateComment,
    ) -> Result<CommentView, ServiceError> {
        let content = validate_content(&input.content)?;

        let mut comment: Comment = self.get_record("comments", id)?;
        if comment.author != actor.id {
            return Err(ServiceError::PermissionDenied(
                "not authorized to update this comment".into(),
            ));
        }

        let now = now_rfc3339();
        comment.content = content;
        comment.is_edited = true;
        comment.edited_at = Some(now.clone());
        comment.updated_at = now;

        let indexes = comment_index_values(&comment);
        self.update_record("comments", id, &comment, &indexes)?;

        self.comment_view(comment)
    }

    /// Delete a comment, its direct replies, and every like on any of
    /// them, in one transaction. Author or admin only.
    pub fn delete_comment(&self, id: &str, actor: &Actor) -> Result<(), ServiceError> {
        let comment: Comment = self.get_record("comments", id)?;

        if comment.author != actor.id && !actor.is_admin() {
            return Err(ServiceError::PermissionDenied(
                "not authorized to delete this comment".into(),
            ));
        }

        let cid = vec![Value::Text(id.to_string())];
        let stmts: Vec<(&str, Vec<Value>)> = vec![
            (
                "DELETE FROM comment_likes WHERE comment_id IN \
                 (SELECT id FROM comments WHERE parent_comment = ?1)",
                cid.clone(),
            ),
            ("DELETE FROM comments WHERE parent_comment = ?1", cid.clone()),
            ("DELETE FROM comment_likes WHERE comment_id = ?1", cid.clone()),
            ("DELETE FROM comments WHERE id = ?1", cid),
        ];

        let affected = self.sql.exec_batch(&stmts).map_err(storage_error)?;
        if affected.last().copied().unwrap_or(0) == 0 {
            return Err(ServiceError::NotFound(format!("comments/{}", id)));
        }
        Ok(())
    }

    // ── Internals ──

    /// Full projection for one comment, replies included when it is
    /// top-level.
    fn comment_view(&self, comment: Comment) -> Result<CommentView, ServiceError> {
        let mut authors = HashMap::new();
        let replies = if comment.parent_comment.is_none() {
            self.comment_replies(&comment.id, &mut authors)?
        } else {
            Vec::new()
        };
        self.assemble_view(comment, replies, &mut authors)
    }

    fn comment_replies(
        &self,
        parent_id: &str,
        authors: &mut HashMap<String, AccountCard>,
    ) -> Result<Vec<CommentView>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data FROM comments WHERE parent_comment = ?1 \
                 ORDER BY created_at ASC, id ASC",
                &[Value::Text(parent_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut replies = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            let comment: Comment = serde_json::from_str(data)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            replies.push(self.assemble_view(comment, Vec::new(), authors)?);
        }
        Ok(replies)
    }

    fn assemble_view(
        &self,
        comment: Comment,
        replies: Vec<CommentView>,
        authors: &mut HashMap<String, AccountCard>,
    ) -> Result<CommentView, ServiceError> {
        let author = self.cached_card(&comment.author, authors)?;
        let likes = self.comment_like_ids(&comment.id)?;

        Ok(CommentView {
            id: comment.id,
            post_id: comment.post_id,
            author,
            content: comment.content,
            parent_comment: comment.parent_comment,
            likes_count: likes.len(),
            likes,
            replies,
            is_edited: comment.is_edited,
            edited_at: comment.edited_at,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }
}
