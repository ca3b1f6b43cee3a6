pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod oauth;
pub mod query;
pub mod response;
pub mod stocks;
pub mod types;
pub mod users;

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;

/// Shared application state: clients built once at startup and injected into
/// every handler. No module-level singletons.
pub struct AppState {
    pub dynamo_client: DynamoClient,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(dynamo_client: DynamoClient, http_client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self {
            dynamo_client,
            http_client,
        })
    }
}
