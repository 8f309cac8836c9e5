//! Comments are subdocuments: every handler here loads the parent gem,
//! changes its comment list, and saves the whole gem back.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::session::AuthContext;
use crate::db::Database;
use crate::models::*;

/// Any logged-in user may comment on any gem.
pub async fn create_comment(
    State(db): State<Database>,
    auth: AuthContext,
    Path(gem_id): Path<Uuid>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Gem>), ApiError> {
    let author = auth.require_user()?;
    let mut gem = db.get_gem(gem_id)?.ok_or(ApiError::NotFound("Gem"))?;

    let comment_id = gem.push_comment(author, input).id;
    let gem = db.save_gem(&gem)?.ok_or(ApiError::Conflict("Gem"))?;

    tracing::info!(%gem_id, %comment_id, %author, "comment added");
    Ok((StatusCode::CREATED, Json(gem)))
}

/// Only the comment's author may delete it.
pub async fn delete_comment(
    State(db): State<Database>,
    auth: AuthContext,
    Path((gem_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    auth.require_user()?;
    let mut gem = db.get_gem(gem_id)?.ok_or(ApiError::NotFound("Gem"))?;

    let comment = gem
        .comment(comment_id)
        .ok_or(ApiError::NotFound("Comment"))?;
    if !auth.is_user(comment.author) {
        tracing::warn!(%gem_id, %comment_id, "comment delete rejected: not the author");
        return Err(ApiError::Unauthorized);
    }

    gem.remove_comment(comment_id);
    db.save_gem(&gem)?.ok_or(ApiError::Conflict("Gem"))?;

    tracing::info!(%gem_id, %comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
