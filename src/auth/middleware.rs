//! Resolves the caller's [`Identity`] for the private routes.
//!
//! HTTP requests carry an `Authorization: Bearer` header. The WebSocket
//! upgrade carries the same token in its query string and goes through
//! [`identity_from_token`] directly.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::user::Identity;
use crate::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = identify(req.headers(), &state.config)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Only a verified token yields `Identity::User`; anything else is rejected.
pub fn identify(headers: &HeaderMap, config: &Config) -> AppResult<Identity> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    identity_from_token(token, config)
}

pub fn identity_from_token(token: &str, config: &Config) -> AppResult<Identity> {
    let data = verify_token(token, config)?;
    Ok(Identity::User(data.claims.sub))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::create_access_token;

    fn config() -> Config {
        Config {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "middleware-secret".into(),
            jwt_access_ttl_secs: 900,
            chat_reply_delay_ms: 0,
        }
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_resolves_to_its_user() {
        let cfg = config();
        let user = Uuid::new_v4();
        let token = create_access_token(user, "sam@example.com", &cfg).unwrap();

        let identity = identify(&headers_with(&format!("Bearer {}", token.access_token)), &cfg);
        assert_eq!(identity.unwrap(), Identity::User(user));
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let cfg = config();
        let token = create_access_token(Uuid::new_v4(), "", &cfg).unwrap();

        assert!(matches!(
            identify(&HeaderMap::new(), &cfg),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            identify(&headers_with(&token.access_token), &cfg),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            identify(&headers_with("Bearer "), &cfg),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            identity_from_token("not-a-jwt", &cfg),
            Err(AppError::Unauthorized)
        ));
    }
}
