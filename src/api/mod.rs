mod error;
mod handlers;
mod middleware;
mod session;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::db::Database;

pub use error::ApiError;
pub use middleware::ServerConfig;
pub use session::AuthContext;

pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, ServerConfig::default())
}

pub fn create_router_with_config(db: Database, config: ServerConfig) -> Router {
    let gems = Router::new()
        .route("/", get(handlers::list_gems))
        .route("/", post(handlers::create_gem))
        .route("/mine", get(handlers::list_my_gems))
        .route("/{id}", get(handlers::get_gem))
        .route("/{id}", put(handlers::update_gem))
        .route("/{id}", delete(handlers::delete_gem));

    let comments = Router::new()
        .route("/{gem_id}", post(handlers::create_comment))
        .route(
            "/delete/{gem_id}/{comment_id}",
            delete(handlers::delete_comment),
        );

    let api = Router::new()
        .nest("/gems", gems)
        .nest("/comments", comments)
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            db.clone(),
            middleware::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
        .with_state(db)
}
