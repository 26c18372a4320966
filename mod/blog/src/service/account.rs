use std::collections::HashMap;

use byline_core::{Actor, PageParams, Pagination, Role, ServiceError, new_id, now_rfc3339};
use byline_sql::Value;
use email_address::EmailAddress;
use tracing::info;

use crate::model::{
    Account, AccountCard, BookmarkCard, CreateAccount, Credentials, OwnProfile, Post,
    PublicProfile, UpdateProfile,
};
use crate::service::BlogService;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const BIO_MAX: usize = 500;

fn validate_username(username: &str) -> Result<(), ServiceError> {
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(ServiceError::Validation(format!(
            "username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    Ok(())
}

impl BlogService {
    /// Register an account. Usernames keep their case; emails are
    /// stored lowercase. The hash goes into its own column, never into
    /// the record.
    pub fn create_account(&self, input: CreateAccount) -> Result<Account, ServiceError> {
        self.insert_account(
            &input.username,
            &input.email,
            &input.password_hash,
            input.bio,
            input.avatar,
            Role::User,
        )
    }

    pub fn get_account(&self, id: &str) -> Result<Account, ServiceError> {
        self.get_record("accounts", id)
    }

    pub fn account_by_username(&self, username: &str) -> Result<Account, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data FROM accounts WHERE username = ?1",
                &[Value::Text(username.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("accounts/{}", username)))?;
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// Profile as shown to anyone, follower and following cards
    /// included.
    pub fn public_profile(&self, username: &str) -> Result<PublicProfile, ServiceError> {
        let account = self.account_by_username(username)?;
        let mut memo = HashMap::new();
        let followers = self.social_cards(&self.follower_ids(&account.id)?, &mut memo)?;
        let following = self.social_cards(&self.following_ids(&account.id)?, &mut memo)?;

        Ok(PublicProfile {
            id: account.id,
            username: account.username,
            bio: account.bio,
            avatar: account.avatar,
            role: account.role,
            is_verified: account.is_verified,
            followers,
            following,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    /// The caller's own profile, with email and bookmarked posts.
    pub fn own_profile(&self, account_id: &str) -> Result<OwnProfile, ServiceError> {
        let account = self.get_account(account_id)?;
        let mut memo = HashMap::new();
        let followers = self.social_cards(&self.follower_ids(&account.id)?, &mut memo)?;
        let following = self.social_cards(&self.following_ids(&account.id)?, &mut memo)?;

        let mut bookmarks = Vec::new();
        for post_id in self.bookmark_post_ids(&account.id)? {
            // A bookmark can lose its post to a concurrent delete;
            // those rows are simply not shown.
            match self.get_record::<Post>("posts", &post_id) {
                Ok(post) => bookmarks.push(BookmarkCard {
                    id: post.id,
                    title: post.title,
                    slug: post.slug,
                    thumbnail: post.thumbnail,
                    author: post.author,
                    created_at: post.created_at,
                }),
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(OwnProfile {
            id: account.id,
            username: account.username,
            email: account.email,
            bio: account.bio,
            avatar: account.avatar,
            role: account.role,
            is_verified: account.is_verified,
            followers,
            following,
            bookmarks,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    /// Apply a profile patch. An empty username or avatar is ignored;
    /// a present bio always lands, so an empty string clears it.
    pub fn update_profile(
        &self,
        account_id: &str,
        patch: UpdateProfile,
    ) -> Result<OwnProfile, ServiceError> {
        let mut account: Account = self.get_record("accounts", account_id)?;

        if let Some(username) = patch.username.as_deref().filter(|u| !u.is_empty()) {
            let username = username.trim();
            validate_username(username)?;
            if username != account.username {
                let taken = self.sql
                    .query(
                        "SELECT id FROM accounts WHERE username = ?1 AND id != ?2",
                        &[
                            Value::Text(username.to_string()),
                            Value::Text(account_id.to_string()),
                        ],
                    )
                    .map_err(|e| ServiceError::Storage(e.to_string()))?;
                if !taken.is_empty() {
                    return Err(ServiceError::Conflict("username already taken".into()));
                }
                account.username = username.to_string();
            }
        }
        if let Some(bio) = &patch.bio {
            if bio.chars().count() > BIO_MAX {
                return Err(ServiceError::Validation(format!(
                    "bio cannot exceed {} characters",
                    BIO_MAX
                )));
            }
            account.bio = bio.clone();
        }
        if let Some(avatar) = patch.avatar.as_deref().filter(|a| !a.is_empty()) {
            account.avatar = avatar.to_string();
        }
        account.updated_at = now_rfc3339();

        // The hash column is left alone; only profile columns move.
        let indexes = vec![
            ("username", Value::Text(account.username.clone())),
            ("email", Value::Text(account.email.clone())),
            ("created_at", Value::Text(account.created_at.clone())),
        ];
        self.update_record("accounts", account_id, &account, &indexes)?;

        self.own_profile(account_id)
    }

    /// Every account, newest first. Admin only.
    pub fn list_accounts(
        &self,
        actor: &Actor,
        page: PageParams,
    ) -> Result<(Vec<Account>, Pagination), ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::PermissionDenied("admin access required".into()));
        }
        let page = page.normalize();
        let total = self.count_records("accounts", &[])? as usize;

        let rows = self.sql
            .query(
                "SELECT data FROM accounts ORDER BY created_at DESC, id ASC \
                 LIMIT ?1 OFFSET ?2",
                &[
                    Value::Integer(page.limit as i64),
                    Value::Integer(page.offset() as i64),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            accounts.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }

        Ok((accounts, Pagination::new(page.page, page.limit, total)))
    }

    /// Look up the stored hash for a login attempt. The caller does
    /// the verification; this layer never sees plaintext.
    pub fn find_credentials(&self, email: &str) -> Result<Credentials, ServiceError> {
        let email = email.trim().to_lowercase();
        let rows = self.sql
            .query(
                "SELECT id, password_hash FROM accounts WHERE email = ?1",
                &[Value::Text(email.clone())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("accounts/{}", email)))?;

        let account_id = row
            .get_str("id")
            .ok_or_else(|| ServiceError::Internal("missing id column".into()))?
            .to_string();
        let password_hash = row
            .get_str("password_hash")
            .ok_or_else(|| ServiceError::Internal("missing password_hash column".into()))?
            .to_string();
        Ok(Credentials { account_id, password_hash })
    }

    /// Look up the named admin account, creating it when absent. Used
    /// at startup so a fresh install has a way in.
    pub fn ensure_admin(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, ServiceError> {
        match self.account_by_username(username.trim()) {
            Ok(account) => Ok(account),
            Err(ServiceError::NotFound(_)) => {
                let account =
                    self.insert_account(username, email, password_hash, None, None, Role::Admin)?;
                info!(username = %account.username, "admin account created");
                Ok(account)
            }
            Err(e) => Err(e),
        }
    }

    // ── Internals ──

    pub(crate) fn account_card(&self, id: &str) -> Result<AccountCard, ServiceError> {
        let account: Account = self.get_record("accounts", id)?;
        Ok(AccountCard {
            id: account.id,
            username: account.username,
            avatar: account.avatar,
            bio: account.bio,
        })
    }

    /// Memoizing [`account_card`], for listings that repeat authors.
    pub(crate) fn cached_card(
        &self,
        id: &str,
        memo: &mut HashMap<String, AccountCard>,
    ) -> Result<AccountCard, ServiceError> {
        if let Some(card) = memo.get(id) {
            return Ok(card.clone());
        }
        let card = self.account_card(id)?;
        memo.insert(id.to_string(), card.clone());
        Ok(card)
    }

    fn social_cards(
        &self,
        ids: &[String],
        memo: &mut HashMap<String, AccountCard>,
    ) -> Result<Vec<AccountCard>, ServiceError> {
        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            match self.cached_card(id, memo) {
                Ok(card) => cards.push(card),
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(cards)
    }

    fn insert_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        bio: Option<String>,
        avatar: Option<String>,
        role: Role,
    ) -> Result<Account, ServiceError> {
        let username = username.trim();
        validate_username(username)?;

        let email = email.trim().to_lowercase();
        if !EmailAddress::is_valid(&email) {
            return Err(ServiceError::Validation("a valid email is required".into()));
        }
        if password_hash.is_empty() {
            return Err(ServiceError::Validation("a password hash is required".into()));
        }
        let bio = bio.unwrap_or_default();
        if bio.chars().count() > BIO_MAX {
            return Err(ServiceError::Validation(format!(
                "bio cannot exceed {} characters",
                BIO_MAX
            )));
        }

        // Friendly duplicate answers; the UNIQUE constraints stay as
        // the backstop for racing registrations.
        let taken = self.sql
            .query(
                "SELECT id FROM accounts WHERE username = ?1",
                &[Value::Text(username.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if !taken.is_empty() {
            return Err(ServiceError::Conflict("username already taken".into()));
        }
        let registered = self.sql
            .query(
                "SELECT id FROM accounts WHERE email = ?1",
                &[Value::Text(email.clone())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if !registered.is_empty() {
            return Err(ServiceError::Conflict("email already registered".into()));
        }

        let now = now_rfc3339();
        let account = Account {
            id: new_id(),
            username: username.to_string(),
            email,
            bio,
            avatar: avatar.unwrap_or_default(),
            role,
            is_verified: false,
            created_at: now.clone(),
            updated_at: now,
        };

        let indexes = vec![
            ("username", Value::Text(account.username.clone())),
            ("email", Value::Text(account.email.clone())),
            ("password_hash", Value::Text(password_hash.to_string())),
            ("created_at", Value::Text(account.created_at.clone())),
        ];
        self.insert_record("accounts", &account.id, &account, &indexes)?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byline_sql::{SQLStore, SqliteStore};
    use std::sync::Arc;

    fn test_service() -> Arc<BlogService> {
        let sql: Arc<dyn SQLStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        BlogService::new(sql).unwrap()
    }

    fn signup(username: &str, email: &str) -> CreateAccount {
        CreateAccount {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            bio: None,
            avatar: None,
        }
    }

    #[test]
    fn create_normalizes_and_defaults() {
        let svc = test_service();

        let account = svc
            .create_account(signup("  Mika  ", " MIKA@Example.COM "))
            .unwrap();

        assert_eq!(account.username, "Mika");
        assert_eq!(account.email, "mika@example.com");
        assert_eq!(account.bio, "");
        assert_eq!(account.avatar, "");
        assert_eq!(account.role, Role::User);
        assert!(!account.is_verified);
        assert_eq!(account.id.len(), 32);
    }

    #[test]
    fn create_rejects_bad_input() {
        let svc = test_service();

        for input in [
            signup("ab", "ab@example.com"),
            signup(&"x".repeat(31), "long@example.com"),
            signup("fine", "not-an-email"),
        ] {
            let err = svc.create_account(input).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }

        let err = svc
            .create_account(CreateAccount {
                password_hash: String::new(),
                ..signup("fine", "fine@example.com")
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .create_account(CreateAccount {
                bio: Some("b".repeat(501)),
                ..signup("fine", "fine@example.com")
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let svc = test_service();
        svc.create_account(signup("mika", "mika@example.com")).unwrap();

        let err = svc
            .create_account(signup("mika", "other@example.com"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(m) if m.contains("username")));

        let err = svc
            .create_account(signup("other", "MIKA@example.com"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(m) if m.contains("email")));
    }

    #[test]
    fn lookup_by_id_and_username() {
        let svc = test_service();
        let account = svc.create_account(signup("mika", "mika@example.com")).unwrap();

        assert_eq!(svc.get_account(&account.id).unwrap().username, "mika");
        assert_eq!(svc.account_by_username("mika").unwrap().id, account.id);

        let card = svc.account_card(&account.id).unwrap();
        assert_eq!(card.username, "mika");

        let err = svc.account_by_username("ghost").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn public_profile_carries_social_cards_but_no_email() {
        let svc = test_service();
        let alice = svc.create_account(signup("alice", "alice@example.com")).unwrap();
        let bob = svc.create_account(signup("bob", "bob@example.com")).unwrap();
        let carol = svc.create_account(signup("carol", "carol@example.com")).unwrap();

        svc.toggle_follow(&alice.id, &bob.id).unwrap();
        svc.toggle_follow(&carol.id, &bob.id).unwrap();
        svc.toggle_follow(&bob.id, &alice.id).unwrap();

        let profile = svc.public_profile("bob").unwrap();
        let followers: Vec<&str> =
            profile.followers.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(followers, vec!["alice", "carol"]);
        assert_eq!(profile.following[0].username, "alice");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());
    }

    #[test]
    fn own_profile_lists_bookmarked_posts() {
        let svc = test_service();
        let account = svc.create_account(signup("mika", "mika@example.com")).unwrap();

        let post = svc
            .create_post(
                &account.id,
                crate::model::CreatePost {
                    title: "Saved For Later".into(),
                    content: "body".into(),
                    category: "tech".into(),
                    excerpt: None,
                    tags: None,
                    status: Some(crate::model::PostStatus::Published),
                    thumbnail: None,
                    seo_title: None,
                    seo_description: None,
                },
            )
            .unwrap();
        svc.toggle_bookmark(&post.id, &account.id).unwrap();

        let profile = svc.own_profile(&account.id).unwrap();
        assert_eq!(profile.email, "mika@example.com");
        assert_eq!(profile.bookmarks.len(), 1);
        assert_eq!(profile.bookmarks[0].title, "Saved For Later");
        assert_eq!(profile.bookmarks[0].slug, "saved-for-later");
    }

    #[test]
    fn profile_patch_applies_field_rules() {
        let svc = test_service();
        let account = svc.create_account(signup("mika", "mika@example.com")).unwrap();
        svc.create_account(signup("taken", "taken@example.com")).unwrap();

        // Empty strings leave username and avatar alone; bio clears.
        let profile = svc
            .update_profile(
                &account.id,
                UpdateProfile {
                    username: Some(String::new()),
                    bio: Some("hello".into()),
                    avatar: Some(String::new()),
                },
            )
            .unwrap();
        assert_eq!(profile.username, "mika");
        assert_eq!(profile.bio, "hello");

        let profile = svc
            .update_profile(
                &account.id,
                UpdateProfile {
                    bio: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.bio, "");

        let err = svc
            .update_profile(
                &account.id,
                UpdateProfile {
                    username: Some("taken".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Re-submitting your own name is not a conflict.
        let profile = svc
            .update_profile(
                &account.id,
                UpdateProfile {
                    username: Some("mika".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.username, "mika");

        let profile = svc
            .update_profile(
                &account.id,
                UpdateProfile {
                    username: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(profile.username, "renamed");
        assert!(svc.account_by_username("renamed").is_ok());
    }

    #[test]
    fn listing_accounts_requires_admin() {
        let svc = test_service();
        let first = svc.create_account(signup("first", "first@example.com")).unwrap();
        svc.create_account(signup("second", "second@example.com")).unwrap();

        let err = svc
            .list_accounts(&Actor::user(first.id.clone()), PageParams::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let (accounts, pagination) = svc
            .list_accounts(&Actor::admin(first.id), PageParams::default())
            .unwrap();
        assert_eq!(pagination.total, 2);
        assert_eq!(accounts[0].username, "second");
        assert_eq!(accounts[1].username, "first");
    }

    #[test]
    fn credentials_resolve_by_normalized_email() {
        let svc = test_service();
        let account = svc.create_account(signup("mika", "mika@example.com")).unwrap();

        let creds = svc.find_credentials(" MIKA@example.com ").unwrap();
        assert_eq!(creds.account_id, account.id);
        assert_eq!(creds.password_hash, "hash");

        let err = svc.find_credentials("ghost@example.com").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn ensure_admin_creates_once() {
        let svc = test_service();

        let first = svc
            .ensure_admin("root", "root@example.com", "hash")
            .unwrap();
        assert_eq!(first.role, Role::Admin);

        let again = svc
            .ensure_admin("root", "root@example.com", "other")
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(svc.count_records("accounts", &[]).unwrap(), 1);
    }
}
