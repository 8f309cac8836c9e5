use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::comment::{Comment, CommentView, CreateCommentInput};
use super::user::{UserId, UserSummary};

/// A gem document.
///
/// The gem is the unit of persistence: its comments live inside it, and every
/// change (including adding or removing a comment) rewrites the whole
/// document. `version` increases by one on each write and is used to reject
/// writes based on a stale read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gem {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub easy_to_find: bool,
    /// Set once at creation from the session. Never changed afterwards.
    pub owner: UserId,
    /// Insertion order is preserved.
    pub comments: Vec<Comment>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gem {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner == user_id
    }

    /// Apply a partial update. The owner is not part of the input and cannot
    /// change here.
    pub fn apply(&mut self, input: UpdateGemInput) {
        if let Some(name) = input.name {
            self.name = name;
        }
        if let Some(color) = input.color {
            self.color = color;
        }
        if let Some(easy_to_find) = input.easy_to_find {
            self.easy_to_find = easy_to_find;
        }
    }

    /// Append a comment authored by `author` and return it. Any `id`,
    /// `author` or `createdAt` in the input is replaced.
    pub fn push_comment(&mut self, author: UserId, input: CreateCommentInput) -> &Comment {
        self.comments.push(Comment {
            id: Uuid::new_v4(),
            author,
            created_at: Utc::now(),
            fields: input.into_fields(),
        });
        &self.comments[self.comments.len() - 1]
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Remove a single comment by id, keeping the rest in order.
    pub fn remove_comment(&mut self, comment_id: Uuid) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(index))
    }
}

/// Input for creating a gem. There is no `owner` field; any
/// owner sent by the client is dropped during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGemInput {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub easy_to_find: bool,
}

/// Input for updating a gem. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGemInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub easy_to_find: Option<bool>,
}

/// A gem with its owner and comment authors resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemView {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub easy_to_find: bool,
    pub owner: UserSummary,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
