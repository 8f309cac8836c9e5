use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical user identifier. Owners and authors are always compared as this
/// type, never as strings.
pub type UserId = Uuid;

/// A user known to the authentication collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// SHA-256 of the bearer token, hex encoded.
    #[serde(skip)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Display-safe projection of a user, used wherever an owner or author is
/// shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    /// `None` when the referenced user no longer exists.
    pub username: Option<String>,
}

impl UserSummary {
    pub fn unresolved(id: UserId) -> Self {
        Self { id, username: None }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: Some(user.username.clone()),
        }
    }
}

/// Input for registering a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
}

/// A freshly registered user together with the plaintext bearer token.
/// The token is only available here; the store keeps its hash.
#[derive(Debug, Clone)]
pub struct IssuedUser {
    pub user: User,
    pub token: String,
}
