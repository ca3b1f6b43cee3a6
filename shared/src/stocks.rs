use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::Value;

use crate::error::ApiError;
use crate::query::{self, ListParams};
use crate::response::Handled;
use crate::types::{CreateStockRequest, UpdateStockRequest};

/// Attributes the server owns. Client-supplied extras must never shadow
/// these: `user_id` is the partition key, so letting it through would write
/// the item into another user's partition.
const RESERVED_ATTRIBUTES: [&str; 4] = ["user_id", "stock_code", "created_at", "updated_at"];

fn is_reserved_attribute(key: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&key)
}

/// List the caller's stocks with filtering, sorting and pagination. The
/// whole partition is re-read on every call, so `total` is always fresh.
pub async fn list_stocks(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    params: &ListParams,
) -> Result<Handled, ApiError> {
    let items = fetch_partition(client, table_name, user_id).await?;
    let values: Vec<Value> = items.iter().map(item_to_stock).collect();
    let (page, pagination) = query::apply(params, values);
    Ok(Handled::paged(Value::Array(page), pagination))
}

/// GET /stocks/{code}
pub async fn get_stock(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    stock_code: &str,
) -> Result<Handled, ApiError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(user_id.to_string()))
        .key("stock_code", AttributeValue::S(stock_code.to_string()))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("stock lookup failed for {}/{}: {:?}", user_id, stock_code, e);
            ApiError::internal("stock lookup failed")
        })?;

    match result.item() {
        Some(item) => Ok(Handled::ok(item_to_stock(item))),
        None => Err(ApiError::NotFound(format!("Stock {} not found", stock_code))),
    }
}

/// POST /stocks/{code}: conditional create, 409 when the pair exists.
pub async fn create_stock(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    stock_code: &str,
    body: &[u8],
) -> Result<Handled, ApiError> {
    let req: CreateStockRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;

    if req.stock_code != stock_code {
        return Err(ApiError::Validation(format!(
            "stock_code in body ({}) does not match path ({})",
            req.stock_code, stock_code
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let mut put = client
        .put_item()
        .table_name(table_name)
        .item("user_id", AttributeValue::S(user_id.to_string()))
        .item("stock_code", AttributeValue::S(stock_code.to_string()))
        .item("stock_name", AttributeValue::S(req.stock_name.clone()))
        .item("quantity", AttributeValue::N(req.quantity.to_string()))
        .item("created_at", AttributeValue::S(now.clone()))
        .item("updated_at", AttributeValue::S(now.clone()))
        .condition_expression("attribute_not_exists(user_id)");

    // Extra scalar attributes ride along; null and nested values are
    // stripped, and reserved attributes cannot be shadowed.
    for (key, value) in &req.extra {
        if is_reserved_attribute(key) {
            continue;
        }
        if let Some(attr) = scalar_attribute(value) {
            put = put.item(key.clone(), attr);
        }
    }

    match put.send().await {
        Ok(_) => {
            tracing::info!("created stock {}/{}", user_id, stock_code);
            Ok(Handled::created(stored_stock_json(user_id, &req, &now)))
        }
        Err(e) => {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                Err(ApiError::Conflict(format!(
                    "Stock {} already exists",
                    stock_code
                )))
            } else {
                tracing::error!(
                    "stock create failed for {}/{}: {:?}",
                    user_id,
                    stock_code,
                    service_err
                );
                Err(ApiError::internal("stock create failed"))
            }
        }
    }
}

/// PUT /stocks/{code}: partial update over the allow-list, conditional on
/// existence (404 when absent).
pub async fn update_stock(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    stock_code: &str,
    body: &[u8],
) -> Result<Handled, ApiError> {
    let req: UpdateStockRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;

    if let Some(body_code) = &req.stock_code {
        if body_code != stock_code {
            return Err(ApiError::Validation(format!(
                "stock_code in body ({}) does not match path ({})",
                body_code, stock_code
            )));
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let Some((expression, values)) = build_update_expression(&req, &now) else {
        return Err(ApiError::Validation(
            "No updatable fields supplied (stock_name, quantity)".to_string(),
        ));
    };

    let mut update = client
        .update_item()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(user_id.to_string()))
        .key("stock_code", AttributeValue::S(stock_code.to_string()))
        .update_expression(expression)
        .condition_expression("attribute_exists(user_id)")
        .return_values(ReturnValue::AllNew);

    for (placeholder, value) in values {
        update = update.expression_attribute_values(placeholder, value);
    }

    match update.send().await {
        Ok(output) => match output.attributes() {
            Some(attributes) => Ok(Handled::ok(item_to_stock(attributes))),
            None => Err(ApiError::internal("update returned no attributes")),
        },
        Err(e) => {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                Err(ApiError::NotFound(format!("Stock {} not found", stock_code)))
            } else {
                tracing::error!(
                    "stock update failed for {}/{}: {:?}",
                    user_id,
                    stock_code,
                    service_err
                );
                Err(ApiError::internal("stock update failed"))
            }
        }
    }
}

/// DELETE /stocks/{code}: reports whether a prior item existed.
pub async fn delete_stock(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
    stock_code: &str,
) -> Result<Handled, ApiError> {
    let result = client
        .delete_item()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(user_id.to_string()))
        .key("stock_code", AttributeValue::S(stock_code.to_string()))
        .return_values(ReturnValue::AllOld)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("stock delete failed for {}/{}: {:?}", user_id, stock_code, e);
            ApiError::internal("stock delete failed")
        })?;

    match result.attributes() {
        Some(attributes) if !attributes.is_empty() => {
            tracing::info!("deleted stock {}/{}", user_id, stock_code);
            Ok(Handled::ok(serde_json::json!({
                "deleted": true,
                "stock_code": stock_code,
            })))
        }
        _ => Err(ApiError::NotFound(format!("Stock {} not found", stock_code))),
    }
}

/// Read the caller's full partition, paging through `last_evaluated_key`.
async fn fetch_partition(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Vec<HashMap<String, AttributeValue>>, ApiError> {
    let mut items = Vec::new();
    let mut last_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let mut request = client
            .query()
            .table_name(table_name)
            .key_condition_expression("user_id = :uid")
            .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()));
        if let Some(key) = last_key.take() {
            request = request.set_exclusive_start_key(Some(key));
        }

        let result = request.send().await.map_err(|e| {
            tracing::error!("stock query failed for {}: {:?}", user_id, e);
            ApiError::internal("stock query failed")
        })?;

        items.extend(result.items().iter().cloned());

        match result.last_evaluated_key() {
            Some(key) if !key.is_empty() => last_key = Some(key.clone()),
            _ => break,
        }
    }

    Ok(items)
}

/// Build the partial SET expression from only the supplied allow-listed
/// fields. Returns None when nothing updatable was supplied.
fn build_update_expression(
    req: &UpdateStockRequest,
    now: &str,
) -> Option<(String, Vec<(String, AttributeValue)>)> {
    let mut parts = Vec::new();
    let mut values = Vec::new();

    if let Some(stock_name) = &req.stock_name {
        parts.push("stock_name = :stock_name");
        values.push((
            ":stock_name".to_string(),
            AttributeValue::S(stock_name.clone()),
        ));
    }

    if let Some(quantity) = req.quantity {
        parts.push("quantity = :quantity");
        values.push((
            ":quantity".to_string(),
            AttributeValue::N(quantity.to_string()),
        ));
    }

    if parts.is_empty() {
        return None;
    }

    parts.push("updated_at = :updated_at");
    values.push((
        ":updated_at".to_string(),
        AttributeValue::S(now.to_string()),
    ));

    Some((format!("SET {}", parts.join(", ")), values))
}

fn scalar_attribute(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::String(s) => Some(AttributeValue::S(s.clone())),
        Value::Number(n) => Some(AttributeValue::N(n.to_string())),
        Value::Bool(b) => Some(AttributeValue::Bool(*b)),
        _ => None,
    }
}

fn attribute_to_value(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => {
            if let Ok(int) = n.parse::<i64>() {
                Value::from(int)
            } else if let Ok(float) = n.parse::<f64>() {
                Value::from(float)
            } else {
                Value::String(n.clone())
            }
        }
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Ss(set) => Value::Array(
            set.iter().map(|s| Value::String(s.clone())).collect(),
        ),
        _ => Value::Null,
    }
}

pub(crate) fn item_to_stock(item: &HashMap<String, AttributeValue>) -> Value {
    let mut map = serde_json::Map::new();
    for (key, attr) in item {
        map.insert(key.clone(), attribute_to_value(attr));
    }
    Value::Object(map)
}

fn stored_stock_json(user_id: &str, req: &CreateStockRequest, now: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("user_id".to_string(), Value::String(user_id.to_string()));
    map.insert(
        "stock_code".to_string(),
        Value::String(req.stock_code.clone()),
    );
    map.insert(
        "stock_name".to_string(),
        Value::String(req.stock_name.clone()),
    );
    map.insert("quantity".to_string(), Value::from(req.quantity));
    map.insert("created_at".to_string(), Value::String(now.to_string()));
    map.insert("updated_at".to_string(), Value::String(now.to_string()));
    for (key, value) in &req.extra {
        // Mirror what was persisted: scalars only, reserved names skipped.
        if !is_reserved_attribute(key) && scalar_attribute(value).is_some() {
            map.insert(key.clone(), value.clone());
        }
    }
    Value::Object(map)
}
