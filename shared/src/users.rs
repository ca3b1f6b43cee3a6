use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;

use crate::error::ApiError;
use crate::oauth::Profile;
use crate::response::Handled;
use crate::types::User;

/// Look up a user by provider subject id.
pub async fn get_user(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Option<User>, ApiError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(user_id.to_string()))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("user lookup failed for {}: {:?}", user_id, e);
            ApiError::internal("user lookup failed")
        })?;

    Ok(result.item().map(item_to_user))
}

/// Create the user on first login; on later logins refresh the picture when
/// it changed. The conditional write resolves the first-login race: a loser
/// re-reads and takes the refresh path.
pub async fn upsert_from_profile(
    client: &DynamoClient,
    table_name: &str,
    profile: &Profile,
    provider: &str,
) -> Result<User, ApiError> {
    match get_user(client, table_name, &profile.id).await? {
        Some(user) => refresh_picture(client, table_name, user, profile).await,
        None => match create_from_profile(client, table_name, profile, provider).await {
            Ok(user) => Ok(user),
            Err(CreateError::AlreadyExists) => {
                match get_user(client, table_name, &profile.id).await? {
                    Some(user) => refresh_picture(client, table_name, user, profile).await,
                    None => Err(ApiError::internal("user disappeared after create conflict")),
                }
            }
            Err(CreateError::Other(e)) => Err(e),
        },
    }
}

enum CreateError {
    AlreadyExists,
    Other(ApiError),
}

async fn create_from_profile(
    client: &DynamoClient,
    table_name: &str,
    profile: &Profile,
    provider: &str,
) -> Result<User, CreateError> {
    let now = chrono::Utc::now().to_rfc3339();

    let mut put = client
        .put_item()
        .table_name(table_name)
        .item("user_id", AttributeValue::S(profile.id.clone()))
        .item("email", AttributeValue::S(profile.email.clone()))
        .item("name", AttributeValue::S(profile.name.clone()))
        .item("providers", AttributeValue::Ss(vec![provider.to_string()]))
        .item("created_at", AttributeValue::S(now.clone()))
        .item("updated_at", AttributeValue::S(now.clone()))
        .condition_expression("attribute_not_exists(user_id)");

    if let Some(picture) = &profile.picture {
        put = put.item("picture", AttributeValue::S(picture.clone()));
    }

    match put.send().await {
        Ok(_) => {
            tracing::info!("created user {} via {}", profile.id, provider);
            Ok(User {
                user_id: profile.id.clone(),
                email: profile.email.clone(),
                name: profile.name.clone(),
                picture: profile.picture.clone(),
                providers: vec![provider.to_string()],
                created_at: now.clone(),
                updated_at: now,
            })
        }
        Err(e) => {
            let service_err = e.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                Err(CreateError::AlreadyExists)
            } else {
                tracing::error!("user create failed for {}: {:?}", profile.id, service_err);
                Err(CreateError::Other(ApiError::internal("user create failed")))
            }
        }
    }
}

async fn refresh_picture(
    client: &DynamoClient,
    table_name: &str,
    mut user: User,
    profile: &Profile,
) -> Result<User, ApiError> {
    let Some(picture) = &profile.picture else {
        return Ok(user);
    };
    if user.picture.as_deref() == Some(picture.as_str()) {
        return Ok(user);
    }

    let now = chrono::Utc::now().to_rfc3339();
    client
        .update_item()
        .table_name(table_name)
        .key("user_id", AttributeValue::S(user.user_id.clone()))
        .update_expression("SET picture = :picture, updated_at = :updated_at")
        .expression_attribute_values(":picture", AttributeValue::S(picture.clone()))
        .expression_attribute_values(":updated_at", AttributeValue::S(now.clone()))
        .send()
        .await
        .map_err(|e| {
            tracing::error!("picture refresh failed for {}: {:?}", user.user_id, e);
            ApiError::internal("user update failed")
        })?;

    user.picture = Some(picture.clone());
    user.updated_at = now;
    Ok(user)
}

/// GET /users/me: the authenticated user's safe profile.
pub async fn get_me(
    client: &DynamoClient,
    table_name: &str,
    user_id: &str,
) -> Result<Handled, ApiError> {
    match get_user(client, table_name, user_id).await? {
        Some(user) => Ok(Handled::ok(serde_json::to_value(user.into_profile())?)),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

fn item_to_user(item: &HashMap<String, AttributeValue>) -> User {
    User {
        user_id: item
            .get("user_id")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        email: item
            .get("email")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        name: item
            .get("name")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        picture: item
            .get("picture")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        providers: item
            .get("providers")
            .and_then(|v| v.as_ss().ok())
            .map(|set| set.to_vec())
            .unwrap_or_default(),
        created_at: item
            .get("created_at")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        updated_at: item
            .get("updated_at")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_to_user_maps_all_fields() {
        let mut item = HashMap::new();
        item.insert("user_id".to_string(), AttributeValue::S("u1".into()));
        item.insert("email".to_string(), AttributeValue::S("u1@example.com".into()));
        item.insert("name".to_string(), AttributeValue::S("User One".into()));
        item.insert(
            "picture".to_string(),
            AttributeValue::S("https://img.example.com/u1.png".into()),
        );
        item.insert(
            "providers".to_string(),
            AttributeValue::Ss(vec!["google".into()]),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S("2026-01-01T00:00:00+00:00".into()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S("2026-01-02T00:00:00+00:00".into()),
        );

        let user = item_to_user(&item);
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.email, "u1@example.com");
        assert_eq!(user.picture.as_deref(), Some("https://img.example.com/u1.png"));
        assert_eq!(user.providers, vec!["google".to_string()]);
    }

    #[test]
    fn item_to_user_tolerates_sparse_items() {
        let mut item = HashMap::new();
        item.insert("user_id".to_string(), AttributeValue::S("u1".into()));
        let user = item_to_user(&item);
        assert_eq!(user.user_id, "u1");
        assert!(user.picture.is_none());
        assert!(user.providers.is_empty());
    }
}
