//! Request identity for service operations.
//!
//! Services never read identity from ambient state. Every operation
//! that needs one takes an [`Actor`] argument. The HTTP layer extracts
//! the actor from gateway-injected headers; library callers and tests
//! construct one directly.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Header carrying the authenticated account id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the actor role. Absent means `user`.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Access level of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role string. Unknown values return None.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a request acts as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Account id of the caller.
    pub id: String,

    /// Role of the caller.
    #[serde(default)]
    pub role: Role,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))?
            .to_string();

        let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
            None => Role::User,
            Some(v) => {
                let raw = v
                    .to_str()
                    .map_err(|_| ServiceError::Unauthorized("invalid actor role".into()))?;
                Role::parse(raw.trim()).ok_or_else(|| {
                    ServiceError::Unauthorized(format!("unknown actor role '{}'", raw))
                })?
            }
        };

        Ok(Actor { id, role })
    }
}
