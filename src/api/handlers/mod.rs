use axum::{response::IntoResponse, Json};

mod comments;
mod gems;

pub use comments::*;
pub use gems::*;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
