//! Request-scoped authentication context.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;
use crate::models::UserId;

/// Who is making the request.
///
/// Inserted into request extensions by
/// [`session_middleware`](super::middleware::session_middleware) and taken by
/// handlers as an extractor. A request with no context is anonymous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Option<UserId>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn logged_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// True when the request is logged in as exactly `user_id`.
    pub fn is_user(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn require_user(&self) -> Result<UserId, ApiError> {
        self.user_id.ok_or(ApiError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .unwrap_or_default())
    }
}
