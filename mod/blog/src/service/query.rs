//! Listing query construction for published posts.
//!
//! Turns filter, sort, and page parameters into the two statements a
//! listing runs: a total count and a page fetch. Only published posts
//! are ever visible through this path.

use byline_core::PageParams;
use byline_sql::Value;

/// Sort order for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    /// Most recently published first.
    #[default]
    Latest,
    /// Oldest published first.
    Oldest,
    /// Most liked first, views as tiebreak.
    Popular,
    /// Most viewed first.
    Views,
}

impl PostSort {
    /// Parse a sort string. Unknown values return None; callers fall
    /// back to the default.
    pub fn parse(s: &str) -> Option<PostSort> {
        match s {
            "latest" => Some(PostSort::Latest),
            "oldest" => Some(PostSort::Oldest),
            "popular" => Some(PostSort::Popular),
            "views" => Some(PostSort::Views),
            _ => None,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            PostSort::Latest => "published_at DESC, id ASC",
            PostSort::Oldest => "published_at ASC, id ASC",
            PostSort::Popular => {
                "(SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id) DESC, \
                 views DESC, id ASC"
            }
            PostSort::Views => "views DESC, id ASC",
        }
    }
}

/// Filter, sort, and page parameters for the published-post listing.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub page: PageParams,
    /// Exact category match, case-insensitive.
    pub category: Option<String>,
    /// Comma-separated tag list; a post matches if it carries any of them.
    pub tags: Option<String>,
    /// Case-insensitive substring over title, content, or tags.
    pub search: Option<String>,
    pub sort: PostSort,
}

/// The statements a listing runs, with normalized page parameters.
pub(crate) struct ListingStatements {
    pub page: PageParams,
    pub count_sql: String,
    pub count_params: Vec<Value>,
    pub page_sql: String,
    pub page_params: Vec<Value>,
}

/// Summary projection shared by every post listing: the record plus
/// the view counter and derived like/comment counts.
pub(crate) const SUMMARY_SELECT: &str = "SELECT data, views, \
    (SELECT COUNT(*) FROM post_likes WHERE post_likes.post_id = posts.id) AS likes_count, \
    (SELECT COUNT(*) FROM comments WHERE comments.post_id = posts.id) AS comments_count \
    FROM posts";

/// Escape LIKE wildcards so user input only ever matches literally.
pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn build_listing(q: &PostQuery) -> ListingStatements {
    let page = q.page.normalize();

    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    params.push(Value::Text("published".into()));
    clauses.push(format!("status = ?{}", params.len()));

    if let Some(category) = &q.category {
        let c = category.trim().to_lowercase();
        if !c.is_empty() {
            params.push(Value::Text(c));
            clauses.push(format!("category = ?{}", params.len()));
        }
    }

    if let Some(tags) = &q.tags {
        let list: Vec<String> = tags
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if !list.is_empty() {
            let mut holes = Vec::with_capacity(list.len());
            for tag in list {
                params.push(Value::Text(tag));
                holes.push(format!("?{}", params.len()));
            }
            clauses.push(format!(
                "id IN (SELECT post_id FROM post_tags WHERE tag IN ({}))",
                holes.join(", ")
            ));
        }
    }

    if let Some(search) = &q.search {
        let s = search.trim();
        if !s.is_empty() {
            let needle = format!("%{}%", escape_like(s));
            params.push(Value::Text(needle.clone()));
            let title_idx = params.len();
            params.push(Value::Text(needle.clone()));
            let content_idx = params.len();
            params.push(Value::Text(needle));
            let tag_idx = params.len();
            clauses.push(format!(
                "(title LIKE ?{} ESCAPE '\\' OR content LIKE ?{} ESCAPE '\\' \
                 OR id IN (SELECT post_id FROM post_tags WHERE tag LIKE ?{} ESCAPE '\\'))",
                title_idx, content_idx, tag_idx,
            ));
        }
    }

    let where_sql = clauses.join(" AND ");

    let count_sql = format!("SELECT COUNT(*) as cnt FROM posts WHERE {}", where_sql);
    let count_params = params.clone();

    let limit_idx = params.len() + 1;
    let offset_idx = params.len() + 2;
    params.push(Value::Integer(page.limit as i64));
    params.push(Value::Integer(page.offset() as i64));

    let page_sql = format!(
        "{} WHERE {} ORDER BY {} LIMIT ?{} OFFSET ?{}",
        SUMMARY_SELECT,
        where_sql,
        q.sort.order_clause(),
        limit_idx,
        offset_idx,
    );

    ListingStatements {
        page,
        count_sql,
        count_params,
        page_sql,
        page_params: params,
    }
}
