//! Server configuration and session resolution middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::cors::CorsLayer;

use super::session::AuthContext;
use crate::db::Database;

/// Server configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (from GEMS_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("GEMS_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s));

        Self { cors_origins }
    }

    /// Create a config with specific CORS origins.
    pub fn with_cors_origins(origins: Vec<String>) -> Self {
        Self {
            cors_origins: Some(origins),
        }
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origins) = &self.cors_origins else {
            return CorsLayer::permissive();
        };

        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }
}

fn parse_origins(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve the caller's session and attach it to the request as an
/// [`AuthContext`].
///
/// No `Authorization` header means an anonymous request. A bearer token that
/// matches a user logs the request in as that user. Anything else is
/// rejected.
pub async fn session_middleware(
    State(db): State<Database>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth = match request.headers().get(header::AUTHORIZATION) {
        None => AuthContext::anonymous(),
        Some(value) => {
            let Some(token) = bearer_token(value) else {
                tracing::warn!("Invalid Authorization header format");
                return Err(StatusCode::UNAUTHORIZED);
            };

            match db.find_user_by_token(token) {
                Ok(Some(user)) => AuthContext::logged_in(user.id),
                Ok(None) => {
                    tracing::warn!("Unknown bearer token provided");
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Err(err) => {
                    tracing::error!(?err, "session lookup failed");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
    };

    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

fn bearer_token(value: &HeaderValue) -> Option<&str> {
    value
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
