use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::user::{UserId, UserSummary};

/// Keys the server owns on every comment. A client cannot set them.
pub const RESERVED_COMMENT_FIELDS: [&str; 3] = ["id", "author", "createdAt"];

/// A comment embedded in a gem.
///
/// Comments are stored inline in their parent's document. Apart from `id`,
/// `author` and `createdAt`, a comment holds whatever fields the client
/// posted. The `author` is always taken from the session of the user who
/// posted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Comment {
    /// A free-form field as a string, if present and a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Input for posting a comment: any JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCommentInput {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CreateCommentInput {
    /// The client's fields with the server-owned keys removed.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = self.fields;
        for key in RESERVED_COMMENT_FIELDS {
            fields.remove(key);
        }
        fields
    }
}

/// A comment with its author resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CommentView {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}
