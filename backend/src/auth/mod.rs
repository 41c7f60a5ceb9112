use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

/// Lifetime of tokens issued by [`create_token`].
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Identity of an authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Issues an HS256 token whose subject is the user id. Account management lives
/// outside this service; this exists for operators and tests.
pub fn create_token(user_id: &str, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
}

/// Returns the user id carried by a valid, unexpired token.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims.sub)
}

/// Resolves the caller from `Authorization: Bearer <jwt>`; handlers that take
/// an `AuthUser` argument are therefore authenticated routes.
#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthenticated("No token, authorization denied".to_string()))?;
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthenticated("Invalid Authorization header format".to_string()))?;
        let user_id = validate_token(token, &state.config.jwt_secret).map_err(|e| {
            log::warn!("Rejected bearer token: {}", e);
            AppError::Unauthenticated("Token is not valid".to_string())
        })?;
        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = create_token("host-1", "s3cret").unwrap();
        assert_eq!(validate_token(&token, "s3cret").unwrap(), "host-1");
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "host-1".to_string(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s3cret")).unwrap();
        assert!(validate_token(&token, "s3cret").is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("host-1", "s3cret").unwrap();
        assert!(validate_token(&token, "other").is_err());
    }
}
