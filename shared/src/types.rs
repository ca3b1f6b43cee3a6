use serde::{Deserialize, Serialize};

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String, // OAuth provider subject id
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub providers: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Client-facing projection of a user record. `providers` and `updated_at`
/// stay internal.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            picture: self.picture,
            created_at: self.created_at,
        }
    }
}

// ========== STOCK ==========
#[derive(Debug, Deserialize)]
pub struct CreateStockRequest {
    pub stock_code: String,
    pub stock_name: String,
    pub quantity: i64, // >= 0 expected, not enforced
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Allow-listed update fields. Anything else in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub quantity: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
