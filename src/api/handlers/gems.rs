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

pub async fn list_gems(State(db): State<Database>) -> Result<Json<Vec<GemView>>, ApiError> {
    Ok(Json(db.get_all_gem_views()?))
}

/// Gems owned by the session user.
pub async fn list_my_gems(
    State(db): State<Database>,
    auth: AuthContext,
) -> Result<Json<Vec<GemView>>, ApiError> {
    let user_id = auth.require_user()?;
    Ok(Json(db.get_gem_views_by_owner(user_id)?))
}

pub async fn create_gem(
    State(db): State<Database>,
    auth: AuthContext,
    Json(input): Json<CreateGemInput>,
) -> Result<(StatusCode, Json<Gem>), ApiError> {
    let owner = auth.require_user()?;
    let gem = db.create_gem(owner, input)?;
    tracing::info!(gem_id = %gem.id, %owner, "gem created");
    Ok((StatusCode::CREATED, Json(gem)))
}

pub async fn get_gem(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<GemView>, ApiError> {
    db.get_gem_view(id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Gem"))
}

/// Owner-only partial update. Responds once the write has committed.
pub async fn update_gem(
    State(db): State<Database>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateGemInput>,
) -> Result<StatusCode, ApiError> {
    let mut gem = db.get_gem(id)?.ok_or(ApiError::NotFound("Gem"))?;
    if !auth.user_id.is_some_and(|user| gem.is_owned_by(user)) {
        tracing::warn!(gem_id = %id, "update rejected: not the owner");
        return Err(ApiError::Unauthorized);
    }

    gem.apply(input);
    db.save_gem(&gem)?.ok_or(ApiError::Conflict("Gem"))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_gem(
    State(db): State<Database>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let gem = db.get_gem(id)?.ok_or(ApiError::NotFound("Gem"))?;
    if !auth.user_id.is_some_and(|user| gem.is_owned_by(user)) {
        tracing::warn!(gem_id = %id, "delete rejected: not the owner");
        return Err(ApiError::Unauthorized);
    }

    if db.delete_gem(id)? {
        tracing::info!(gem_id = %id, "gem deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Gem"))
    }
}
