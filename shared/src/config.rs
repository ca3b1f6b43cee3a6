use crate::error::ApiError;

/// Keys that must be present and non-blank before any request is handled.
pub const REQUIRED_KEYS: &[&str] = &[
    "JWT_SECRET",
    "GOOGLE_CLIENT_ID",
    "GOOGLE_CLIENT_SECRET",
    "GOOGLE_REDIRECT_URI",
    "USERS_TABLE",
    "STOCKS_TABLE",
    "AWS_REGION",
];

const DEFAULT_CALLBACK_URL: &str = "http://localhost:3000/callback";

/// Environment-sourced configuration. Loading never fails; `validate`
/// reports every missing required key at once so a single 500 can name
/// them all.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub users_table: String,
    pub stocks_table: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allowed_origin: String,
    pub default_callback_url: String,
    pub production: bool,
    missing: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Single loading abstraction: every deployment target supplies values
    /// through the same lookup, so there is no runtime-dependent branching.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut missing = Vec::new();
        let mut required = |key: &str| -> String {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => value,
                _ => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        };

        let jwt_secret = required("JWT_SECRET");
        let google_client_id = required("GOOGLE_CLIENT_ID");
        let google_client_secret = required("GOOGLE_CLIENT_SECRET");
        let google_redirect_uri = required("GOOGLE_REDIRECT_URI");
        let users_table = required("USERS_TABLE");
        let stocks_table = required("STOCKS_TABLE");
        let region = required("AWS_REGION");

        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            jwt_secret,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            users_table,
            stocks_table,
            region,
            endpoint_url: optional("DYNAMODB_ENDPOINT"),
            access_key_id: optional("AWS_ACCESS_KEY_ID"),
            secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            allowed_origin: optional("ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
            default_callback_url: optional("DEFAULT_CALLBACK_URL")
                .unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string()),
            production: optional("STAGE")
                .map(|stage| stage == "prod" || stage == "production")
                .unwrap_or(false),
            missing,
        }
    }

    /// Fails closed when any required key is absent or blank. Runs on every
    /// request, not just at startup.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Config {
                missing: self.missing.clone(),
            })
        }
    }
}

/// Example value shown next to a missing key outside production. Key names
/// only, never actual values.
pub fn example_format(key: &str) -> &'static str {
    match key {
        "JWT_SECRET" => "a 32+ character random string",
        "GOOGLE_CLIENT_ID" => "1234567890-abc.apps.googleusercontent.com",
        "GOOGLE_CLIENT_SECRET" => "GOCSPX-xxxxxxxx",
        "GOOGLE_REDIRECT_URI" => "https://api.example.com/auth/google",
        "USERS_TABLE" => "stockbox-users",
        "STOCKS_TABLE" => "stockbox-stocks",
        "AWS_REGION" => "ap-southeast-2",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env(key: &str) -> Option<String> {
        match key {
            "JWT_SECRET" => Some("super-secret".into()),
            "GOOGLE_CLIENT_ID" => Some("client-id".into()),
            "GOOGLE_CLIENT_SECRET" => Some("client-secret".into()),
            "GOOGLE_REDIRECT_URI" => Some("https://api.example.com/auth/google".into()),
            "USERS_TABLE" => Some("users".into()),
            "STOCKS_TABLE" => Some("stocks".into()),
            "AWS_REGION" => Some("us-east-1".into()),
            _ => None,
        }
    }

    #[test]
    fn complete_environment_validates() {
        let cfg = Config::from_lookup(full_env);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.stocks_table, "stocks");
        assert_eq!(cfg.allowed_origin, "*");
        assert_eq!(cfg.default_callback_url, DEFAULT_CALLBACK_URL);
        assert!(!cfg.production);
        assert!(cfg.endpoint_url.is_none());
    }

    #[test]
    fn missing_and_blank_keys_are_reported_together() {
        let cfg = Config::from_lookup(|key| match key {
            "JWT_SECRET" => None,
            "AWS_REGION" => Some("   ".into()),
            other => full_env(other),
        });
        match cfg.validate() {
            Err(ApiError::Config { missing }) => {
                assert_eq!(missing, vec!["JWT_SECRET".to_string(), "AWS_REGION".to_string()]);
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn stage_prod_flips_production() {
        let cfg = Config::from_lookup(|key| match key {
            "STAGE" => Some("prod".into()),
            other => full_env(other),
        });
        assert!(cfg.production);
    }

    #[test]
    fn optional_overrides_are_picked_up() {
        let cfg = Config::from_lookup(|key| match key {
            "DYNAMODB_ENDPOINT" => Some("http://localhost:8000".into()),
            "ALLOWED_ORIGIN" => Some("https://app.example.com".into()),
            "DEFAULT_CALLBACK_URL" => Some("https://app.example.com/login".into()),
            other => full_env(other),
        });
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(cfg.allowed_origin, "https://app.example.com");
        assert_eq!(cfg.default_callback_url, "https://app.example.com/login");
    }

    #[test]
    fn every_required_key_has_an_example() {
        for key in REQUIRED_KEYS {
            assert_ne!(example_format(key), "", "no example for {}", key);
        }
    }
}
