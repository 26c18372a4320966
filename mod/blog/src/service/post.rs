use std::collections::HashMap;

use byline_core::{Actor, PageParams, Pagination, ServiceError, new_id, now_rfc3339};
use byline_sql::{Row, Value};
use tracing::warn;

use crate::model::{
    AccountCard, CreatePost, Post, PostDetail, PostStatus, PostSummary, TagCount, UpdatePost,
};
use crate::service::derive::{derive_excerpt, estimate_read_time, normalize_tags, slugify};
use crate::service::query::{PostQuery, SUMMARY_SELECT, build_listing};
use crate::service::{BlogService, storage_error};

const TITLE_MAX: usize = 200;
const EXCERPT_MAX: usize = 300;
const FEATURED_LIMIT: usize = 6;
const TAG_LIMIT: usize = 20;

/// Treat empty strings like absent fields when applying a partial update.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

impl BlogService {
    // ── Post lifecycle ──

    /// Create a post, deriving slug, excerpt, and read time.
    pub fn create_post(&self, author_id: &str, input: CreatePost) -> Result<PostDetail, ServiceError> {
        let title = input.title.trim().to_string();
        let category = input.category.trim().to_lowercase();

        if title.is_empty() || input.content.is_empty() || category.is_empty() {
            return Err(ServiceError::Validation(
                "title, content, and category are required".into(),
            ));
        }
        if title.chars().count() > TITLE_MAX {
            return Err(ServiceError::Validation(format!(
                "title cannot exceed {} characters",
                TITLE_MAX
            )));
        }
        if let Some(ref excerpt) = input.excerpt {
            if excerpt.chars().count() > EXCERPT_MAX {
                return Err(ServiceError::Validation(format!(
                    "excerpt cannot exceed {} characters",
                    EXCERPT_MAX
                )));
            }
        }

        // Author must resolve before anything is written.
        let author = self.account_card(author_id)?;

        let id = new_id();
        let now = now_rfc3339();
        let status = input.status.unwrap_or_default();

        let base = slugify(&title);
        let base = if base.is_empty() { id.clone() } else { base };
        let slug = self.unique_slug(&base, None)?;

        let excerpt = match present(&input.excerpt) {
            Some(e) => e.to_string(),
            None => derive_excerpt(&input.content),
        };

        let post = Post {
            id: id.clone(),
            title,
            slug,
            read_time: estimate_read_time(&input.content),
            content: input.content,
            excerpt,
            tags: normalize_tags(input.tags.as_deref().unwrap_or(&[])),
            category,
            thumbnail: input.thumbnail.unwrap_or_default(),
            author: author.id.clone(),
            status,
            featured: false,
            seo_title: input.seo_title.filter(|s| !s.is_empty()),
            seo_description: input.seo_description.filter(|s| !s.is_empty()),
            published_at: (status == PostStatus::Published).then(|| now.clone()),
            created_at: now.clone(),
            updated_at: now,
        };

        let indexes = post_index_values(&post);
        let (post_sql, post_params) = Self::record_insert_sql("posts", &id, &post, &indexes)?;

        // Record and tag rows land in one transaction.
        let mut stmts: Vec<(&str, Vec<Value>)> = vec![(post_sql.as_str(), post_params)];
        for tag in &post.tags {
            stmts.push((
                "INSERT INTO post_tags (post_id, tag) VALUES (?1, ?2)",
                vec![Value::Text(id.clone()), Value::Text(tag.clone())],
            ));
        }
        self.sql.exec_batch(&stmts).map_err(storage_error)?;

        self.post_detail(post, 0)
    }

    /// Apply a partial update. Only the author or an admin may mutate.
    ///
    /// Slug, excerpt, and read time re-derive only when the title is
    /// part of the patch; content-only edits leave them untouched. The
    /// publication timestamp is stamped on the first transition into
    /// `published` regardless of which field carried the status change,
    /// and is never overwritten afterward.
    pub fn update_post(
        &self,
        id: &str,
        actor: &Actor,
        patch: UpdatePost,
    ) -> Result<PostDetail, ServiceError> {
        let mut post: Post = self.get_record("posts", id)?;

        if post.author != actor.id && !actor.is_admin() {
            return Err(ServiceError::PermissionDenied(
                "not authorized to update this post".into(),
            ));
        }

        if let Some(title) = present(&patch.title) {
            if title.trim().chars().count() > TITLE_MAX {
                return Err(ServiceError::Validation(format!(
                    "title cannot exceed {} characters",
                    TITLE_MAX
                )));
            }
        }
        if let Some(excerpt) = present(&patch.excerpt) {
            if excerpt.chars().count() > EXCERPT_MAX {
                return Err(ServiceError::Validation(format!(
                    "excerpt cannot exceed {} characters",
                    EXCERPT_MAX
                )));
            }
        }

        let mut title_changed = false;
        if let Some(title) = present(&patch.title) {
            let trimmed = title.trim();
            if !trimmed.is_empty() {
                post.title = trimmed.to_string();
                title_changed = true;
            }
        }
        if let Some(content) = present(&patch.content) {
            post.content = content.to_string();
        }
        if let Some(category) = present(&patch.category) {
            post.category = category.trim().to_lowercase();
        }
        if let Some(excerpt) = present(&patch.excerpt) {
            post.excerpt = excerpt.to_string();
        }
        if let Some(tags) = &patch.tags {
            // An explicit empty list clears the tag set.
            post.tags = normalize_tags(tags);
        }
        if let Some(status) = patch.status {
            post.status = status;
        }
        if let Some(featured) = patch.featured {
            post.featured = featured;
        }
        if let Some(thumbnail) = present(&patch.thumbnail) {
            post.thumbnail = thumbnail.to_string();
        }
        if let Some(seo_title) = present(&patch.seo_title) {
            post.seo_title = Some(seo_title.to_string());
        }
        if let Some(seo_description) = present(&patch.seo_description) {
            post.seo_description = Some(seo_description.to_string());
        }

        if title_changed {
            let base = slugify(&post.title);
            let base = if base.is_empty() { post.id.clone() } else { base };
            post.slug = self.unique_slug(&base, Some(&post.id))?;

            if post.excerpt.is_empty() && !post.content.is_empty() {
                post.excerpt = derive_excerpt(&post.content);
            }
            if !post.content.is_empty() {
                post.read_time = estimate_read_time(&post.content);
            }
        }

        let now = now_rfc3339();
        if post.status == PostStatus::Published && post.published_at.is_none() {
            post.published_at = Some(now.clone());
        }
        post.updated_at = now;

        let indexes = post_index_values(&post);
        let (post_sql, post_params) = Self::record_update_sql("posts", id, &post, &indexes)?;

        // Tag rewrites ride the same transaction as the record update.
        // The guarded insert only writes tag rows while the post row
        // still exists, so a concurrent delete cannot leave orphans.
        let mut stmts: Vec<(&str, Vec<Value>)> = vec![(post_sql.as_str(), post_params)];
        stmts.push((
            "DELETE FROM post_tags WHERE post_id = ?1",
            vec![Value::Text(id.to_string())],
        ));
        for tag in &post.tags {
            stmts.push((
                "INSERT INTO post_tags (post_id, tag) \
                 SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM posts WHERE id = ?1)",
                vec![Value::Text(id.to_string()), Value::Text(tag.clone())],
            ));
        }
        let affected = self.sql.exec_batch(&stmts).map_err(storage_error)?;
        if affected.first().copied().unwrap_or(0) == 0 {
            return Err(ServiceError::NotFound(format!("posts/{}", id)));
        }

        let views = self.post_views(id)?;
        self.post_detail(post, views)
    }

    /// Delete a post and everything hanging off it: comments (replies
    /// included), comment likes, post likes, bookmarks, and tag rows.
    /// All steps run in one transaction; a failure mid-cascade leaves
    /// the store untouched.
    pub fn delete_post(&self, id: &str, actor: &Actor) -> Result<(), ServiceError> {
        let post: Post = self.get_record("posts", id)?;

        if post.author != actor.id && !actor.is_admin() {
            return Err(ServiceError::PermissionDenied(
                "not authorized to delete this post".into(),
            ));
        }

        let pid = vec![Value::Text(id.to_string())];
        let stmts: Vec<(&str, Vec<Value>)> = vec![
            (
                "DELETE FROM comment_likes WHERE comment_id IN \
                 (SELECT id FROM comments WHERE post_id = ?1)",
                pid.clone(),
            ),
            // Replies carry the same post_id, so one sweep removes the
            // whole thread set.
            ("DELETE FROM comments WHERE post_id = ?1", pid.clone()),
            ("DELETE FROM post_likes WHERE post_id = ?1", pid.clone()),
            ("DELETE FROM bookmarks WHERE post_id = ?1", pid.clone()),
            ("DELETE FROM post_tags WHERE post_id = ?1", pid.clone()),
            ("DELETE FROM posts WHERE id = ?1", pid),
        ];

        let affected = self.sql.exec_batch(&stmts).map_err(storage_error)?;
        if affected.last().copied().unwrap_or(0) == 0 {
            return Err(ServiceError::NotFound(format!("posts/{}", id)));
        }
        Ok(())
    }

    /// Fetch a published post by slug, bumping its view counter.
    ///
    /// The increment runs as a single atomic statement so concurrent
    /// reads never lose counts. A failed increment is logged and does
    /// not fail the read.
    pub fn get_post_by_slug(&self, slug: &str) -> Result<PostDetail, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data, views FROM posts WHERE slug = ?1 AND status = ?2",
                &[Value::Text(slug.to_string()), Value::Text("published".into())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("posts/{}", slug)))?;

        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        let post: Post = serde_json::from_str(data)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let stored_views = row.get_i64("views").unwrap_or(0) as u64;

        let views = match self.sql.exec(
            "UPDATE posts SET views = views + 1 WHERE id = ?1",
            &[Value::Text(post.id.clone())],
        ) {
            Ok(_) => stored_views + 1,
            Err(e) => {
                warn!(post = %post.id, error = %e, "view count increment failed");
                stored_views
            }
        };

        self.post_detail(post, views)
    }

    // ── Listings ──

    /// List published posts with filters, sort, and pagination.
    pub fn list_posts(
        &self,
        query: &PostQuery,
    ) -> Result<(Vec<PostSummary>, Pagination), ServiceError> {
        let stmts = build_listing(query);

        let count_rows = self.sql
            .query(&stmts.count_sql, &stmts.count_params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let rows = self.sql
            .query(&stmts.page_sql, &stmts.page_params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let posts = self.rows_to_summaries(&rows)?;

        Ok((
            posts,
            Pagination::new(stmts.page.page, stmts.page.limit, total),
        ))
    }

    /// Published posts flagged as featured, newest first, at most six.
    pub fn featured_posts(&self) -> Result<Vec<PostSummary>, ServiceError> {
        let sql = format!(
            "{} WHERE status = ?1 AND featured = 1 \
             ORDER BY published_at DESC, id ASC LIMIT ?2",
            SUMMARY_SELECT,
        );
        let rows = self.sql
            .query(
                &sql,
                &[
                    Value::Text("published".into()),
                    Value::Integer(FEATURED_LIMIT as i64),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        self.rows_to_summaries(&rows)
    }

    /// Published posts by the account behind `username`, newest first.
    pub fn posts_by_author(
        &self,
        username: &str,
        page: PageParams,
    ) -> Result<(Vec<PostSummary>, Pagination), ServiceError> {
        let account = self.account_by_username(username)?;
        let page = page.normalize();

        let total = self.count_records(
            "posts",
            &[
                ("author", Value::Text(account.id.clone())),
                ("status", Value::Text("published".into())),
            ],
        )? as usize;

        let sql = format!(
            "{} WHERE author = ?1 AND status = ?2 \
             ORDER BY published_at DESC, id ASC LIMIT ?3 OFFSET ?4",
            SUMMARY_SELECT,
        );
        let rows = self.sql
            .query(
                &sql,
                &[
                    Value::Text(account.id),
                    Value::Text("published".into()),
                    Value::Integer(page.limit as i64),
                    Value::Integer(page.offset() as i64),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let posts = self.rows_to_summaries(&rows)?;

        Ok((posts, Pagination::new(page.page, page.limit, total)))
    }

    /// The actor's own posts, drafts included, most recently edited
    /// first. An unrecognized status filter simply matches nothing.
    pub fn my_posts(
        &self,
        actor: &Actor,
        status: Option<&str>,
        page: PageParams,
    ) -> Result<(Vec<PostSummary>, Pagination), ServiceError> {
        let page = page.normalize();

        let mut filters: Vec<(&str, Value)> =
            vec![("author", Value::Text(actor.id.clone()))];
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            filters.push(("status", Value::Text(status.to_string())));
        }

        let total = self.count_records("posts", &filters)? as usize;

        let mut clauses = Vec::new();
        let mut params = Vec::new();
        for (i, (col, val)) in filters.iter().enumerate() {
            clauses.push(format!("{} = ?{}", col, i + 1));
            params.push(val.clone());
        }
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(page.limit as i64));
        params.push(Value::Integer(page.offset() as i64));

        let sql = format!(
            "{} WHERE {} ORDER BY updated_at DESC, id ASC LIMIT ?{} OFFSET ?{}",
            SUMMARY_SELECT,
            clauses.join(" AND "),
            limit_idx,
            offset_idx,
        );
        let rows = self.sql
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let posts = self.rows_to_summaries(&rows)?;

        Ok((posts, Pagination::new(page.page, page.limit, total)))
    }

    /// Distinct categories across published posts, alphabetical.
    pub fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT DISTINCT category FROM posts WHERE status = ?1 ORDER BY category",
                &[Value::Text("published".into())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str("category").map(str::to_string))
            .collect())
    }

    /// The twenty most-used tags across published posts, by usage
    /// count descending, name as tiebreak.
    pub fn popular_tags(&self) -> Result<Vec<TagCount>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT tag, COUNT(*) as cnt FROM post_tags \
                 JOIN posts ON posts.id = post_tags.post_id \
                 WHERE posts.status = ?1 \
                 GROUP BY tag ORDER BY cnt DESC, tag ASC LIMIT ?2",
                &[
                    Value::Text("published".into()),
                    Value::Integer(TAG_LIMIT as i64),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = r.get_str("tag")?.to_string();
                let count = r.get_i64("cnt")? as u64;
                Some(TagCount { name, count })
            })
            .collect())
    }

    // ── Internals ──

    /// Find a slug not taken by any other post, suffixing `-2`, `-3`,
    /// ... on collision. The UNIQUE constraint remains the backstop
    /// for two writers racing to the same candidate.
    fn unique_slug(&self, base: &str, exclude_id: Option<&str>) -> Result<String, ServiceError> {
        let mut candidate = base.to_string();
        let mut n = 1usize;
        loop {
            let rows = match exclude_id {
                Some(id) => self.sql.query(
                    "SELECT id FROM posts WHERE slug = ?1 AND id != ?2",
                    &[Value::Text(candidate.clone()), Value::Text(id.to_string())],
                ),
                None => self.sql.query(
                    "SELECT id FROM posts WHERE slug = ?1",
                    &[Value::Text(candidate.clone())],
                ),
            }
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

            if rows.is_empty() {
                return Ok(candidate);
            }
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
    }

    pub(crate) fn post_views(&self, id: &str) -> Result<u64, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT views FROM posts WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows.first().and_then(|r| r.get_i64("views")).unwrap_or(0) as u64)
    }

    /// Assemble the full projection for a post record.
    pub(crate) fn post_detail(&self, post: Post, views: u64) -> Result<PostDetail, ServiceError> {
        let author = self.account_card(&post.author)?;
        let likes = self.post_like_ids(&post.id)?;
        let comments = self.post_comment_ids(&post.id)?;

        Ok(PostDetail {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            tags: post.tags,
            category: post.category,
            thumbnail: post.thumbnail,
            author,
            likes_count: likes.len(),
            likes,
            comments_count: comments.len(),
            comments,
            views,
            read_time: post.read_time,
            status: post.status,
            featured: post.featured,
            seo_title: post.seo_title,
            seo_description: post.seo_description,
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }

    fn post_comment_ids(&self, post_id: &str) -> Result<Vec<String>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT id FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
                &[Value::Text(post_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str("id").map(str::to_string))
            .collect())
    }

    fn rows_to_summaries(&self, rows: &[Row]) -> Result<Vec<PostSummary>, ServiceError> {
        let mut authors: HashMap<String, AccountCard> = HashMap::new();
        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(self.summary_from_row(row, &mut authors)?);
        }
        Ok(posts)
    }

    fn summary_from_row(
        &self,
        row: &Row,
        authors: &mut HashMap<String, AccountCard>,
    ) -> Result<PostSummary, ServiceError> {
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        let post: Post = serde_json::from_str(data)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let author = self.cached_card(&post.author, authors)?;

        Ok(PostSummary {
            id: post.id,
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            tags: post.tags,
            category: post.category,
            thumbnail: post.thumbnail,
            author,
            likes_count: row.get_i64("likes_count").unwrap_or(0) as usize,
            comments_count: row.get_i64("comments_count").unwrap_or(0) as usize,
            views: row.get_i64("views").unwrap_or(0) as u64,
            read_time: post.read_time,
            status: post.status,
            featured: post.featured,
            published_at: post.published_at,
            created_at: post.created_at,
            updated_at: post.updated_at,
        })
    }
}

/// Indexed column values mirrored from a post record. The `views`
/// column is deliberately absent: it only ever changes through the
/// atomic increment.
fn post_index_values(post: &Post) -> Vec<(&'static str, Value)> {
    vec![
        ("slug", Value::Text(post.slug.clone())),
        ("title", Value::Text(post.title.clone())),
        ("content", Value::Text(post.content.clone())),
        ("author", Value::Text(post.author.clone())),
        ("category", Value::Text(post.category.clone())),
        ("status", Value::Text(post.status.as_str().to_string())),
        ("featured", Value::Integer(post.featured as i64)),
        (
            "published_at",
            match &post.published_at {
                Some(t) => Value::Text(t.clone()),
                None => Value::Null,
            },
        ),
        ("created_at", Value::Text(post.created_at.clone())),
        ("updated_at", Value::Text(post.updated_at.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, CreateAccount};
    use crate::service::query::PostSort;
    use byline_sql::{SQLStore, SqliteStore};
    use std::sync::Arc;

    fn test_service() -> Arc<BlogService> {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        BlogService::new(sql).unwrap()
    }

    fn seed_account(svc: &BlogService, username: &str) -> Account {
        svc.create_account(CreateAccount {
            username: username.into(),
            email: format!("{}@example.com", username),
            password_hash: "hash".into(),
            bio: None,
            avatar: None,
        })
        .unwrap()
    }

    fn draft_input(title: &str) -> CreatePost {
        CreatePost {
            title: title.into(),
            content: "Some body text".into(),
            category: "Tech".into(),
            excerpt: None,
            tags: None,
            status: None,
            thumbnail: None,
            seo_title: None,
            seo_description: None,
        }
    }

    fn published_input(title: &str) -> CreatePost {
        CreatePost {
            status: Some(PostStatus::Published),
            ..draft_input(title)
        }
    }

    #[test]
    fn create_derives_slug_excerpt_read_time() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        let words = vec!["word"; 450].join(" ");
        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    content: format!("<p>{}</p>", words),
                    ..draft_input("Hello, World!")
                },
            )
            .unwrap();

        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.read_time, 3);
        assert!(post.excerpt.ends_with("..."));
        assert!(!post.excerpt.contains('<'));
        assert_eq!(post.category, "tech");
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.published_at.is_none());
        assert_eq!(post.author.username, "ada");
        assert_eq!(post.views, 0);
    }

    #[test]
    fn create_requires_title_content_category() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        for input in [
            CreatePost { title: "  ".into(), ..draft_input("x") },
            CreatePost { content: String::new(), ..draft_input("x") },
            CreatePost { category: String::new(), ..draft_input("x") },
        ] {
            let err = svc.create_post(&author.id, input).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }

        let err = svc
            .create_post(&author.id, draft_input(&"t".repeat(201)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .create_post("ghost", draft_input("No author"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn explicit_excerpt_wins_over_derivation() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    excerpt: Some("Hand-written summary".into()),
                    ..draft_input("Custom Excerpt")
                },
            )
            .unwrap();
        assert_eq!(post.excerpt, "Hand-written summary");

        let err = svc
            .create_post(
                &author.id,
                CreatePost {
                    excerpt: Some("e".repeat(301)),
                    ..draft_input("Too Long")
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn colliding_slugs_get_numeric_suffixes() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        let p1 = svc.create_post(&author.id, draft_input("Same Title")).unwrap();
        let p2 = svc.create_post(&author.id, draft_input("Same Title")).unwrap();
        let p3 = svc.create_post(&author.id, draft_input("Same Title!")).unwrap();

        assert_eq!(p1.slug, "same-title");
        assert_eq!(p2.slug, "same-title-2");
        assert_eq!(p3.slug, "same-title-3");
    }

    #[test]
    fn symbol_only_title_falls_back_to_id() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        let post = svc.create_post(&author.id, draft_input("!!!")).unwrap();
        assert_eq!(post.slug, post.id);
    }

    #[test]
    fn tags_are_normalized_and_stored() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    tags: Some(vec![" Rust ".into(), "RUST".into(), "Web".into()]),
                    ..published_input("Tagged")
                },
            )
            .unwrap();
        assert_eq!(post.tags, vec!["rust", "web"]);

        let tags = svc.popular_tags().unwrap();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn published_at_stamps_once_and_survives_status_cycles() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        let post = svc.create_post(&author.id, draft_input("Lifecycle")).unwrap();
        assert!(post.published_at.is_none());

        let post = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .unwrap();
        let first = post.published_at.clone().unwrap();

        let post = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    status: Some(PostStatus::Draft),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(post.published_at.as_deref(), Some(first.as_str()));

        let post = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(post.published_at.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn content_only_edit_leaves_derived_fields_alone() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        let post = svc.create_post(&author.id, draft_input("Stable Title")).unwrap();
        let (slug, excerpt, read_time) =
            (post.slug.clone(), post.excerpt.clone(), post.read_time);

        let long_content = vec!["word"; 900].join(" ");
        let post = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    content: Some(long_content.clone()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(post.content, long_content);
        assert_eq!(post.slug, slug);
        assert_eq!(post.excerpt, excerpt);
        assert_eq!(post.read_time, read_time);
    }

    #[test]
    fn title_edit_rederives_slug_and_read_time() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        let long_content = vec!["word"; 900].join(" ");
        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    content: long_content,
                    ..draft_input("First Title")
                },
            )
            .unwrap();
        let original_excerpt = post.excerpt.clone();
        assert_eq!(post.read_time, 5);

        // Shrink the content and retitle in one patch: read time follows
        // the new content, the stored excerpt is kept since it's non-empty.
        let post = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    title: Some("Second Title".into()),
                    content: Some("short now".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(post.slug, "second-title");
        assert_eq!(post.read_time, 1);
        assert_eq!(post.excerpt, original_excerpt);
    }

    #[test]
    fn retitled_slug_collision_excludes_self() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        let post = svc.create_post(&author.id, draft_input("Keep Me")).unwrap();
        // Re-saving the same title must keep the same slug, not suffix it.
        let updated = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    title: Some("Keep Me".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.slug, "keep-me");
    }

    #[test]
    fn update_ignores_empty_strings_but_clears_tags() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    tags: Some(vec!["rust".into()]),
                    ..draft_input("Original")
                },
            )
            .unwrap();

        let updated = svc
            .update_post(
                &post.id,
                &actor,
                UpdatePost {
                    title: Some(String::new()),
                    content: Some(String::new()),
                    category: Some(String::new()),
                    tags: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Original");
        assert_eq!(updated.content, "Some body text");
        assert_eq!(updated.category, "tech");
        assert!(updated.tags.is_empty());
    }

    #[test]
    fn update_requires_owner_or_admin() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let other = seed_account(&svc, "eve");

        let post = svc.create_post(&author.id, draft_input("Mine")).unwrap();

        let err = svc
            .update_post(
                &post.id,
                &Actor::user(other.id.clone()),
                UpdatePost {
                    title: Some("Stolen".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let updated = svc
            .update_post(
                &post.id,
                &Actor::admin(other.id),
                UpdatePost {
                    featured: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(updated.featured);

        let err = svc
            .update_post("missing", &Actor::user(author.id), UpdatePost::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn delete_cascades_comments_likes_bookmarks_tags() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let reader = seed_account(&svc, "bob");
        let actor = Actor::user(author.id.clone());

        let post = svc
            .create_post(
                &author.id,
                CreatePost {
                    tags: Some(vec!["rust".into()]),
                    ..published_input("Doomed")
                },
            )
            .unwrap();

        let c1 = svc
            .create_comment(&post.id, &reader.id, crate::model::CreateComment {
                content: "top".into(),
                parent_comment: None,
            })
            .unwrap();
        svc.create_comment(&post.id, &author.id, crate::model::CreateComment {
            content: "reply".into(),
            parent_comment: Some(c1.id.clone()),
        })
        .unwrap();

        svc.toggle_post_like(&post.id, &reader.id).unwrap();
        svc.toggle_bookmark(&post.id, &reader.id).unwrap();
        svc.toggle_comment_like(&c1.id, &reader.id).unwrap();

        svc.delete_post(&post.id, &actor).unwrap();

        let err = svc.get_post_by_slug("doomed").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        for table in ["comments", "post_likes", "comment_likes", "bookmarks", "post_tags"] {
            let left = svc.count_records(table, &[]).unwrap();
            assert_eq!(left, 0, "{} not emptied", table);
        }

        let err = svc
            .delete_post(&post.id, &Actor::user(author.id))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn delete_requires_owner_or_admin() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let other = seed_account(&svc, "eve");

        let post = svc.create_post(&author.id, draft_input("Protected")).unwrap();
        let err = svc
            .delete_post(&post.id, &Actor::user(other.id.clone()))
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        svc.delete_post(&post.id, &Actor::admin(other.id)).unwrap();
    }

    #[test]
    fn slug_fetch_counts_views_and_hides_drafts() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        svc.create_post(&author.id, published_input("Visible")).unwrap();
        svc.create_post(&author.id, draft_input("Hidden")).unwrap();

        let first = svc.get_post_by_slug("visible").unwrap();
        assert_eq!(first.views, 1);
        let second = svc.get_post_by_slug("visible").unwrap();
        assert_eq!(second.views, 2);

        let err = svc.get_post_by_slug("hidden").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn listing_paginates_23_items_into_3_pages() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        for i in 1..=23 {
            svc.create_post(&author.id, published_input(&format!("Post {:02}", i)))
                .unwrap();
        }

        let (posts, pagination) = svc
            .list_posts(&PostQuery {
                page: PageParams { page: 3, limit: 10 },
                sort: PostSort::Oldest,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(pagination.total, 23);
        assert_eq!(pagination.pages, 3);
        assert_eq!(posts.len(), 3);
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 21", "Post 22", "Post 23"]);
    }

    #[test]
    fn listing_never_shows_drafts_or_content() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        svc.create_post(&author.id, published_input("Public")).unwrap();
        svc.create_post(&author.id, draft_input("Secret Draft")).unwrap();

        let (posts, pagination) = svc.list_posts(&PostQuery::default()).unwrap();
        assert_eq!(pagination.total, 1);
        assert_eq!(posts[0].title, "Public");

        let json = serde_json::to_value(&posts[0]).unwrap();
        assert!(json.get("content").is_none());
    }

    #[test]
    fn listing_filters_by_category_tags_search() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        svc.create_post(
            &author.id,
            CreatePost {
                category: "Tech".into(),
                tags: Some(vec!["rust".into()]),
                ..published_input("Async Patterns")
            },
        )
        .unwrap();
        svc.create_post(
            &author.id,
            CreatePost {
                category: "Life".into(),
                tags: Some(vec!["travel".into()]),
                ..published_input("Walking in Kyoto")
            },
        )
        .unwrap();

        let (posts, _) = svc
            .list_posts(&PostQuery {
                category: Some("TECH".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Async Patterns");

        let (posts, _) = svc
            .list_posts(&PostQuery {
                tags: Some("travel, food".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Walking in Kyoto");

        let (posts, _) = svc
            .list_posts(&PostQuery {
                search: Some("async".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(posts.len(), 1);

        let (posts, _) = svc
            .list_posts(&PostQuery {
                search: Some("rust".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(posts.len(), 1, "search should also match tags");
    }

    #[test]
    fn popular_sort_ranks_by_likes_then_views() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let fans: Vec<Account> = (0..3)
            .map(|i| seed_account(&svc, &format!("fan{}", i)))
            .collect();

        let liked = svc.create_post(&author.id, published_input("Crowd Favorite")).unwrap();
        let viewed = svc.create_post(&author.id, published_input("Quietly Read")).unwrap();
        svc.create_post(&author.id, published_input("Ignored")).unwrap();

        for fan in &fans {
            svc.toggle_post_like(&liked.id, &fan.id).unwrap();
        }
        svc.get_post_by_slug(&viewed.slug).unwrap();
        svc.get_post_by_slug(&viewed.slug).unwrap();

        let (posts, _) = svc
            .list_posts(&PostQuery {
                sort: PostSort::Popular,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(posts[0].title, "Crowd Favorite");
        assert_eq!(posts[1].title, "Quietly Read");
        assert_eq!(posts[2].title, "Ignored");
    }

    #[test]
    fn featured_listing_is_capped_at_six() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let admin = Actor::admin(author.id.clone());

        for i in 0..8 {
            let post = svc
                .create_post(&author.id, published_input(&format!("Feature {}", i)))
                .unwrap();
            svc.update_post(
                &post.id,
                &admin,
                UpdatePost {
                    featured: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        // Draft featured posts stay invisible.
        let draft = svc.create_post(&author.id, draft_input("Feature Draft")).unwrap();
        svc.update_post(
            &draft.id,
            &admin,
            UpdatePost {
                featured: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let featured = svc.featured_posts().unwrap();
        assert_eq!(featured.len(), 6);
        assert!(featured.iter().all(|p| p.featured));
    }

    #[test]
    fn author_listing_shows_published_only() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        svc.create_post(&author.id, published_input("Out There")).unwrap();
        svc.create_post(&author.id, draft_input("Still Cooking")).unwrap();

        let (posts, pagination) = svc
            .posts_by_author("ada", PageParams::default())
            .unwrap();
        assert_eq!(pagination.total, 1);
        assert_eq!(posts[0].title, "Out There");

        let err = svc
            .posts_by_author("nobody", PageParams::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn my_posts_includes_drafts_and_filters_status() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");
        let actor = Actor::user(author.id.clone());

        svc.create_post(&author.id, published_input("Shipped")).unwrap();
        svc.create_post(&author.id, draft_input("In Progress")).unwrap();

        let (posts, pagination) = svc
            .my_posts(&actor, None, PageParams::default())
            .unwrap();
        assert_eq!(pagination.total, 2);
        // Most recently edited first.
        assert_eq!(posts[0].title, "In Progress");

        let (posts, _) = svc
            .my_posts(&actor, Some("draft"), PageParams::default())
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "In Progress");

        let (posts, pagination) = svc
            .my_posts(&actor, Some("weird"), PageParams::default())
            .unwrap();
        assert!(posts.is_empty());
        assert_eq!(pagination.total, 0);
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        for (title, category) in [("A", "Zeta"), ("B", "alpha"), ("C", "Zeta")] {
            svc.create_post(
                &author.id,
                CreatePost {
                    category: category.into(),
                    ..published_input(title)
                },
            )
            .unwrap();
        }
        svc.create_post(
            &author.id,
            CreatePost {
                category: "hidden".into(),
                ..draft_input("D")
            },
        )
        .unwrap();

        assert_eq!(svc.categories().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn popular_tags_counts_usage_descending() {
        let svc = test_service();
        let author = seed_account(&svc, "ada");

        for i in 0..3 {
            svc.create_post(
                &author.id,
                CreatePost {
                    tags: Some(vec!["rust".into()]),
                    ..published_input(&format!("R{}", i))
                },
            )
            .unwrap();
        }
        svc.create_post(
            &author.id,
            CreatePost {
                tags: Some(vec!["web".into()]),
                ..published_input("W")
            },
        )
        .unwrap();
        svc.create_post(
            &author.id,
            CreatePost {
                tags: Some(vec!["draft-only".into()]),
                ..draft_input("D")
            },
        )
        .unwrap();

        let tags = svc.popular_tags().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0], TagCount { name: "rust".into(), count: 3 });
        assert_eq!(tags[1], TagCount { name: "web".into(), count: 1 });
    }
}
