use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lambda_http::Request;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const TOKEN_COOKIE: &str = "token";

/// Session token claims. Stateless: issued once at login, verified on every
/// request, never stored server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Pull the bearer token from the Authorization header, falling back to the
/// `token` cookie.
pub fn extract_token(event: &Request) -> Option<String> {
    if let Some(value) = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
    {
        if let Some((scheme, token)) = value.split_once(' ') {
            if scheme.eq_ignore_ascii_case("bearer") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookies = event
        .headers()
        .get("Cookie")
        .and_then(|v| v.to_str().ok())?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| {
            cookie
                .strip_prefix(TOKEN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|token| token.to_string())
}

/// Verify signature and expiry, then sanity-check the subject claim. A valid
/// token without a subject is rejected rather than crashing downstream.
pub fn verify(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::warn!("token verification failed: {}", e);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if data.claims.sub.trim().is_empty() {
        return Err(ApiError::Unauthorized("Corrupted auth info".to_string()));
    }

    Ok(data.claims)
}

/// Sign a fresh session token for a user.
pub fn issue(user_id: &str, role: &str, secret: &str) -> Result<String, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("failed to sign session token: {}", e)))
}

/// Full per-request check: extract then verify. Terminal on failure, no
/// retries, no shared state.
pub fn authenticate(event: &Request, secret: &str) -> Result<Claims, ApiError> {
    let token = extract_token(event)
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".to_string()))?;
    verify(&token, secret)
}
