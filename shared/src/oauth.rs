use lambda_http::{Body, Response};
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::{auth, response, users, AppState};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub const PROVIDER: &str = "google";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Identity-provider profile attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackState {
    callback_url: Option<String>,
}

/// Exchange an authorization code for the Google profile behind it.
pub async fn exchange_code(
    http: &reqwest::Client,
    cfg: &Config,
    code: &str,
) -> Result<Profile, ApiError> {
    let token_response = http
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("code", code),
            ("client_id", cfg.google_client_id.as_str()),
            ("client_secret", cfg.google_client_secret.as_str()),
            ("redirect_uri", cfg.google_redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| {
            tracing::error!("token exchange request failed: {}", e);
            ApiError::internal("token exchange failed")
        })?;

    if token_response.status().is_client_error() {
        tracing::warn!(
            "token exchange rejected with status {}",
            token_response.status()
        );
        return Err(ApiError::Unauthorized(
            "Authorization code exchange failed".to_string(),
        ));
    }

    let token: TokenResponse = token_response.json().await.map_err(|e| {
        tracing::error!("token exchange returned malformed body: {}", e);
        ApiError::internal("token exchange failed")
    })?;

    let profile: Profile = http
        .get(USERINFO_ENDPOINT)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            tracing::error!("userinfo request failed: {}", e);
            ApiError::internal("profile fetch failed")
        })?
        .json()
        .await
        .map_err(|e| {
            tracing::error!("userinfo returned malformed body: {}", e);
            ApiError::internal("profile fetch failed")
        })?;

    Ok(profile)
}

/// Pull the redirect target out of the `state` parameter (URL-decoded JSON
/// `{"callback_url": ...}`), falling back to the configured default when the
/// state is absent, unparseable, or missing the field.
pub fn resolve_callback_url(state: Option<&str>, default_url: &str) -> String {
    let Some(raw) = state else {
        return default_url.to_string();
    };
    match serde_json::from_str::<CallbackState>(raw) {
        Ok(CallbackState {
            callback_url: Some(url),
        }) if !url.trim().is_empty() => url,
        Ok(_) => default_url.to_string(),
        Err(e) => {
            tracing::warn!("unparseable callback state, using default: {}", e);
            default_url.to_string()
        }
    }
}

/// Append the session token to the callback URL as a `jwt` query parameter.
pub fn append_jwt(callback_url: &str, token: &str, fallback_url: &str) -> String {
    let parsed = Url::parse(callback_url).or_else(|_| Url::parse(fallback_url));
    match parsed {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("jwt", token);
            url.to_string()
        }
        Err(_) => format!("{}?jwt={}", fallback_url, token),
    }
}

/// GET /auth/google: exchange the code, resolve the user, issue a session
/// token, redirect. Failures in the middle surface as a generic 500; the
/// specific cause is logged where it happens.
pub async fn handle_callback(
    state: &AppState,
    cfg: &Config,
    code: Option<&str>,
    callback_state: Option<&str>,
) -> Result<Response<Body>, ApiError> {
    let code = code.ok_or_else(|| {
        ApiError::Unauthorized("Missing authorization code".to_string())
    })?;

    let profile = exchange_code(&state.http_client, cfg, code).await?;
    if profile.id.trim().is_empty() || profile.email.trim().is_empty() {
        tracing::warn!("identity provider returned an incomplete profile");
        return Err(ApiError::Unauthorized(
            "Incomplete identity profile".to_string(),
        ));
    }

    let user =
        users::upsert_from_profile(&state.dynamo_client, &cfg.users_table, &profile, PROVIDER)
            .await?;
    let token = auth::issue(&user.user_id, "user", &cfg.jwt_secret)?;

    let callback = resolve_callback_url(callback_state, &cfg.default_callback_url);
    let location = append_jwt(&callback, &token, &cfg.default_callback_url);

    tracing::info!("oauth login complete for user {}", user.user_id);
    response::redirect(&cfg.allowed_origin, &location)
}
