use byline_core::ServiceError;
use byline_sql::SQLStore;

/// SQL DDL statements to initialize the blog database schema.
///
/// Entity tables store the full JSON document in a `data` TEXT column,
/// with indexed columns extracted for filtering and uniqueness. The
/// relationship sets (likes, bookmarks, follows, post tags) are plain
/// join tables with composite primary keys, so membership flips are
/// single atomic statements.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        username TEXT UNIQUE,
        email TEXT UNIQUE,
        password_hash TEXT,
        created_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        slug TEXT UNIQUE,
        title TEXT,
        content TEXT,
        author TEXT,
        category TEXT,
        status TEXT,
        featured INTEGER DEFAULT 0,
        views INTEGER DEFAULT 0,
        published_at TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        post_id TEXT,
        author TEXT,
        parent_comment TEXT,
        created_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS post_tags (
        post_id TEXT NOT NULL,
        tag TEXT NOT NULL,
        PRIMARY KEY (post_id, tag)
    )",
    "CREATE TABLE IF NOT EXISTS post_likes (
        post_id TEXT NOT NULL,
        account_id TEXT NOT NULL,
        created_at TEXT,
        PRIMARY KEY (post_id, account_id)
    )",
    "CREATE TABLE IF NOT EXISTS comment_likes (
        comment_id TEXT NOT NULL,
        account_id TEXT NOT NULL,
        created_at TEXT,
        PRIMARY KEY (comment_id, account_id)
    )",
    "CREATE TABLE IF NOT EXISTS bookmarks (
        account_id TEXT NOT NULL,
        post_id TEXT NOT NULL,
        created_at TEXT,
        PRIMARY KEY (account_id, post_id)
    )",
    "CREATE TABLE IF NOT EXISTS follows (
        follower_id TEXT NOT NULL,
        followee_id TEXT NOT NULL,
        created_at TEXT,
        PRIMARY KEY (follower_id, followee_id)
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status)",
    "CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category, status)",
    "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author, status)",
    "CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_comment)",
    "CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author)",
    "CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag)",
    "CREATE INDEX IF NOT EXISTS idx_post_likes_account ON post_likes(account_id)",
    "CREATE INDEX IF NOT EXISTS idx_bookmarks_post ON bookmarks(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id)",
];

pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(format!("schema init failed: {}", e)))?;
    }
    Ok(())
}
