use byline_core::Role;
use serde::{Deserialize, Serialize};

/// An author or reader identity.
///
/// The credential hash is never part of this record; it lives in its
/// own column and only surfaces through [`Credentials`]. Follower,
/// following, and bookmark sets are held in join tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier (UUIDv4, no dashes).
    pub id: String,

    /// Unique handle, 3 to 30 characters.
    pub username: String,

    /// Unique email, stored lowercase.
    pub email: String,

    /// Short self-description, at most 500 characters.
    #[serde(default)]
    pub bio: String,

    /// Stored-asset reference for the profile image.
    #[serde(default)]
    pub avatar: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub is_verified: bool,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Input for registering a new account.
///
/// Credential hashing happens upstream; this layer only stores the
/// resulting hash.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Partial profile update. Absent fields are left unchanged.
///
/// An empty username or avatar is ignored; `bio` is applied whenever
/// present, so an explicit empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Compact account projection embedded in posts and comments.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccountCard {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub bio: String,
}

/// Public profile. Email and credentials are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub bio: String,
    pub avatar: String,
    pub role: Role,
    pub is_verified: bool,
    pub followers: Vec<AccountCard>,
    pub following: Vec<AccountCard>,
    pub created_at: String,
    pub updated_at: String,
}

/// The caller's own profile, email and bookmarks included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar: String,
    pub role: Role,
    pub is_verified: bool,
    pub followers: Vec<AccountCard>,
    pub following: Vec<AccountCard>,
    pub bookmarks: Vec<BookmarkCard>,
    pub created_at: String,
    pub updated_at: String,
}

/// Compact post projection listed under a profile's bookmarks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub thumbnail: String,
    /// Account id of the post's author.
    pub author: String,
    pub created_at: String,
}

/// Login seam for an external credential verifier.
///
/// Deliberately not serializable; the hash must not leak onto the wire.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub account_id: String,
    pub password_hash: String,
}
