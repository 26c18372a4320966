use byline_core::{ServiceError, now_rfc3339};
use byline_sql::Value;
use serde::Serialize;

use crate::model::{Comment, Post};
use crate::service::BlogService;

/// Result of a like toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkState {
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub is_following: bool,
}

impl BlogService {
    /// Like a post, or withdraw the like if it is already there.
    pub fn toggle_post_like(
        &self,
        post_id: &str,
        account_id: &str,
    ) -> Result<LikeState, ServiceError> {
        let _: Post = self.get_record("posts", post_id)?;
        let is_liked =
            self.toggle_membership("post_likes", "post_id", "account_id", post_id, account_id)?;
        let likes_count = self.count_records("post_likes", &[("post_id", Value::Text(post_id.into()))])? as usize;
        Ok(LikeState { is_liked, likes_count })
    }

    /// Like a comment, or withdraw the like.
    pub fn toggle_comment_like(
        &self,
        comment_id: &str,
        account_id: &str,
    ) -> Result<LikeState, ServiceError> {
        let _: Comment = self.get_record("comments", comment_id)?;
        let is_liked = self.toggle_membership(
            "comment_likes",
            "comment_id",
            "account_id",
            comment_id,
            account_id,
        )?;
        let likes_count = self.count_records(
            "comment_likes",
            &[("comment_id", Value::Text(comment_id.into()))],
        )? as usize;
        Ok(LikeState { is_liked, likes_count })
    }

    /// Save a post to the account's reading list, or remove it.
    pub fn toggle_bookmark(
        &self,
        post_id: &str,
        account_id: &str,
    ) -> Result<BookmarkState, ServiceError> {
        let _: Post = self.get_record("posts", post_id)?;
        let is_bookmarked =
            self.toggle_membership("bookmarks", "post_id", "account_id", post_id, account_id)?;
        Ok(BookmarkState { is_bookmarked })
    }

    /// Follow another account, or unfollow. Following yourself is
    /// rejected without touching the store.
    pub fn toggle_follow(
        &self,
        follower_id: &str,
        target_id: &str,
    ) -> Result<FollowState, ServiceError> {
        if follower_id == target_id {
            return Err(ServiceError::Validation("you cannot follow yourself".into()));
        }
        self.get_account(target_id)?;
        let is_following = self.toggle_membership(
            "follows",
            "followee_id",
            "follower_id",
            target_id,
            follower_id,
        )?;
        Ok(FollowState { is_following })
    }

    pub(crate) fn post_like_ids(&self, post_id: &str) -> Result<Vec<String>, ServiceError> {
        self.member_ids("post_likes", "post_id", "account_id", post_id)
    }

    pub(crate) fn comment_like_ids(&self, comment_id: &str) -> Result<Vec<String>, ServiceError> {
        self.member_ids("comment_likes", "comment_id", "account_id", comment_id)
    }

    /// Ids of posts the account has bookmarked, oldest first.
    pub(crate) fn bookmark_post_ids(&self, account_id: &str) -> Result<Vec<String>, ServiceError> {
        self.member_ids("bookmarks", "account_id", "post_id", account_id)
    }

    pub(crate) fn follower_ids(&self, account_id: &str) -> Result<Vec<String>, ServiceError> {
        self.member_ids("follows", "followee_id", "follower_id", account_id)
    }

    pub(crate) fn following_ids(&self, account_id: &str) -> Result<Vec<String>, ServiceError> {
        self.member_ids("follows", "follower_id", "followee_id", account_id)
    }

    // ── Internals ──

    /// Flip membership in a two-column association table. Returns true
    /// when the row is present after the call. The primary key makes
    /// the insert a no-op when the pair already exists, so the flip is
    /// race-safe without a read-modify-write.
    fn toggle_membership(
        &self,
        table: &str,
        owner_col: &str,
        member_col: &str,
        owner: &str,
        member: &str,
    ) -> Result<bool, ServiceError> {
        let insert = format!(
            "INSERT OR IGNORE INTO {} ({}, {}, created_at) VALUES (?1, ?2, ?3)",
            table, owner_col, member_col
        );
        let affected = self.sql
            .exec(
                &insert,
                &[
                    Value::Text(owner.to_string()),
                    Value::Text(member.to_string()),
                    Value::Text(now_rfc3339()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 1 {
            return Ok(true);
        }

        let delete = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            table, owner_col, member_col
        );
        self.sql
            .exec(
                &delete,
                &[Value::Text(owner.to_string()), Value::Text(member.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(false)
    }

    /// Members of an association, oldest membership first.
    fn member_ids(
        &self,
        table: &str,
        owner_col: &str,
        member_col: &str,
        owner: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1 ORDER BY created_at ASC, {} ASC",
            member_col, table, owner_col, member_col
        );
        let rows = self.sql
            .query(&sql, &[Value::Text(owner.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str(member_col).map(str::to_string))
            .collect())
    }
}
