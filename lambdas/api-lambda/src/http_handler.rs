use lambda_http::{
    http::Method, Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;
use stockbox_shared::{
    auth,
    config::Config,
    error::ApiError,
    oauth,
    query::ListParams,
    response::{self, Handled, RequestContext},
    stocks, users, AppState,
};

/// Main Lambda handler: config validation, CORS, auth, then route dispatch.
/// Every outcome funnels through the response formatter.
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let ctx = RequestContext::new();
    let method = event.method().clone();
    let path = event.uri().path().to_string();
    tracing::info!("{} {} (request {})", method, path, ctx.request_id);

    // Config is checked per request: deployment targets differ in where
    // environment values come from.
    let cfg = Config::from_env();
    if let Err(e) = cfg.validate() {
        tracing::error!("configuration incomplete: {}", e);
        return Ok(response::failure(&ctx, &cfg.allowed_origin, &e, cfg.production)?);
    }
    let origin = cfg.allowed_origin.clone();

    if method == Method::OPTIONS {
        return Ok(response::preflight(&origin)?);
    }

    // OAuth callback is the only unauthenticated route.
    if method == Method::GET && path == "/auth/google" {
        let params = event.query_string_parameters();
        let result =
            oauth::handle_callback(&state, &cfg, params.first("code"), params.first("state"))
                .await;
        return match result {
            Ok(redirect) => Ok(redirect),
            Err(e) => {
                tracing::error!("oauth callback failed (request {}): {}", ctx.request_id, e);
                Ok(response::failure(&ctx, &origin, &e, cfg.production)?)
            }
        };
    }

    // Everything else requires a verified subject, before any database call.
    let claims = match auth::authenticate(&event, &cfg.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("authentication rejected (request {}): {}", ctx.request_id, e);
            return Ok(response::failure(&ctx, &origin, &e, cfg.production)?);
        }
    };
    let user_id = claims.sub;

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let result: Result<Handled, ApiError> = match (&method, parts.as_slice()) {
        // GET /stocks - paged, filtered, sorted list
        (&Method::GET, ["stocks"]) => {
            let pairs: Vec<(String, String)> = event
                .query_string_parameters()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            match ListParams::from_pairs(&pairs) {
                Ok(params) => {
                    stocks::list_stocks(&state.dynamo_client, &cfg.stocks_table, &user_id, &params)
                        .await
                }
                Err(e) => Err(e),
            }
        }
        (&Method::GET, ["stocks", code]) => {
            stocks::get_stock(&state.dynamo_client, &cfg.stocks_table, &user_id, code).await
        }
        (&Method::POST, ["stocks", code]) => {
            stocks::create_stock(
                &state.dynamo_client,
                &cfg.stocks_table,
                &user_id,
                code,
                event.body(),
            )
            .await
        }
        (&Method::PUT, ["stocks", code]) => {
            stocks::update_stock(
                &state.dynamo_client,
                &cfg.stocks_table,
                &user_id,
                code,
                event.body(),
            )
            .await
        }
        (&Method::DELETE, ["stocks", code]) => {
            stocks::delete_stock(&state.dynamo_client, &cfg.stocks_table, &user_id, code).await
        }
        (&Method::GET, ["users", "me"]) => {
            users::get_me(&state.dynamo_client, &cfg.users_table, &user_id).await
        }
        _ => Err(ApiError::NotFound("Not found".to_string())),
    };

    match result {
        Ok(handled) => Ok(response::success(&ctx, &origin, handled)?),
        Err(e) => {
            if e.status().is_server_error() {
                tracing::error!("request {} failed: {}", ctx.request_id, e);
            }
            Ok(response::failure(&ctx, &origin, &e, cfg.production)?)
        }
    }
}
