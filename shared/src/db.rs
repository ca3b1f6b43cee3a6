use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::Client as DynamoClient;

use crate::config::Config;
use crate::error::ApiError;

/// Build the DynamoDB client from config: region is mandatory, retries are
/// bounded, and an endpoint override points at DynamoDB Local (plain HTTP).
pub async fn build_client(cfg: &Config) -> Result<DynamoClient, ApiError> {
    if cfg.region.trim().is_empty() {
        return Err(ApiError::internal(
            "cannot build DynamoDB client: AWS_REGION is not set",
        ));
    }

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(cfg.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(3));

    if let (Some(key_id), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key_id.clone(),
            secret.clone(),
            None,
            None,
            "static",
        ));
    }

    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &cfg.endpoint_url {
        tracing::info!("using DynamoDB endpoint override: {}", endpoint);
        builder = builder.endpoint_url(endpoint.clone());
    }

    Ok(DynamoClient::from_conf(builder.build()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn base_env(key: &str) -> Option<String> {
        match key {
            "JWT_SECRET" => Some("secret".into()),
            "GOOGLE_CLIENT_ID" => Some("id".into()),
            "GOOGLE_CLIENT_SECRET" => Some("secret".into()),
            "GOOGLE_REDIRECT_URI" => Some("https://api.example.com/auth/google".into()),
            "USERS_TABLE" => Some("users".into()),
            "STOCKS_TABLE" => Some("stocks".into()),
            "AWS_REGION" => Some("us-east-1".into()),
            "AWS_ACCESS_KEY_ID" => Some("AKIATEST".into()),
            "AWS_SECRET_ACCESS_KEY" => Some("testsecret".into()),
            "DYNAMODB_ENDPOINT" => Some("http://localhost:8000".into()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn builds_with_endpoint_override_and_static_credentials() {
        let cfg = Config::from_lookup(base_env);
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert!(build_client(&cfg).await.is_ok());
    }

    #[tokio::test]
    async fn builds_without_optional_overrides() {
        let cfg = Config::from_lookup(|key| match key {
            "AWS_ACCESS_KEY_ID" | "AWS_SECRET_ACCESS_KEY" | "DYNAMODB_ENDPOINT" => None,
            other => base_env(other),
        });
        assert!(build_client(&cfg).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_blank_region() {
        let mut cfg = Config::from_lookup(base_env);
        cfg.region = String::new();
        assert!(build_client(&cfg).await.is_err());
    }
}
