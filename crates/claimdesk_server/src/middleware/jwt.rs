//! Bearer-token authentication.
//!
//! A valid HS256 token puts a [`Session`] into the request extensions; the
//! `sub` claim is the user id. A request without an Authorization header
//! passes through with no session, and the service answers it with
//! `Unauthenticated`. A present but invalid token is rejected here with 401.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use claimdesk_core::{AdminError, Session};

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present.
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn session_for(&self, token: &str) -> Option<Session> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .inspect_err(|e| tracing::debug!(error = %e, "bearer token rejected"))
            .ok()?;
        Uuid::parse_str(&data.claims.sub).ok().map(Session::new)
    }
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match req.headers().get(AUTHORIZATION) {
        None => return next.run(req).await,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string()),
    };

    match token.and_then(|t| config.session_for(&t)) {
        Some(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        None => AppError::from(AdminError::Unauthenticated).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: u64,
    }

    fn token(secret: &[u8], sub: &str, exp: u64) -> String {
        encode(
            &Header::default(),
            &Claims { sub, exp },
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        jsonwebtoken::get_current_timestamp() + 3600
    }

    #[test]
    fn valid_token_yields_session() {
        let id = Uuid::new_v4();
        let config = JwtConfig::from_secret(b"secret");
        let session = config.session_for(&token(b"secret", &id.to_string(), far_future()));
        assert_eq!(session, Some(Session::new(id)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = JwtConfig::from_secret(b"secret");
        let t = token(b"other", &Uuid::new_v4().to_string(), far_future());
        assert_eq!(config.session_for(&t), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = JwtConfig::from_secret(b"secret");
        let t = token(b"secret", &Uuid::new_v4().to_string(), 1_000);
        assert_eq!(config.session_for(&t), None);
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let config = JwtConfig::from_secret(b"secret");
        assert_eq!(
            config.session_for(&token(b"secret", "test-admin", far_future())),
            None
        );
    }
}
