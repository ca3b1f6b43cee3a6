use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;
use stockbox_shared::{config::Config, db, AppState};

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Startup wiring; configuration is re-validated on every request.
    let config = Config::from_env();
    config.validate()?;

    let dynamo_client = db::build_client(&config).await?;
    let state = AppState::new(dynamo_client, reqwest::Client::new());

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
