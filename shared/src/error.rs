use lambda_http::http::StatusCode;
use thiserror::Error;

use crate::config;

/// Error taxonomy for the whole API. Every handler failure funnels through
/// here and is rendered by the response formatter.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required configuration: {}", .missing.join(", "))]
    Config { missing: Vec<String> },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to echo to the client. Internal detail and configuration
    /// hints are only exposed outside production; the full error is always
    /// logged server-side at the point it is raised.
    pub fn client_message(&self, production: bool) -> String {
        match self {
            ApiError::Config { missing } => {
                if production {
                    "Server configuration error".to_string()
                } else {
                    let detail: Vec<String> = missing
                        .iter()
                        .map(|key| match config::example_format(key) {
                            "" => key.clone(),
                            hint => format!("{} (e.g. {})", key, hint),
                        })
                        .collect();
                    format!("Missing required configuration: {}", detail.join(", "))
                }
            }
            ApiError::Internal(detail) => {
                if production {
                    "Internal server error".to_string()
                } else {
                    detail.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::Config { missing: vec!["JWT_SECRET".into()] }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_redacted_in_production() {
        let err = ApiError::Internal("dynamodb exploded".into());
        assert_eq!(err.client_message(true), "Internal server error");
        assert_eq!(err.client_message(false), "dynamodb exploded");
    }

    #[test]
    fn config_error_names_keys_outside_production() {
        let err = ApiError::Config {
            missing: vec!["JWT_SECRET".into(), "AWS_REGION".into()],
        };
        let msg = err.client_message(false);
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("AWS_REGION"));
        assert!(msg.contains("e.g."));
        assert_eq!(err.client_message(true), "Server configuration error");
    }
}
