use serde::{Deserialize, Serialize};

// ========== CALLER ==========
/// Authenticated principal making the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>, // admin | user
}

// ========== PROFILE ==========
/// Profile stored in DynamoDB, keyed by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub email: String,
    pub user_id: Option<String>,
    pub role: String,     // admin | user
    pub wbl_role: String, // sub_admin | researcher | ...
    pub full_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written to an existing profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    pub role: String,
    pub wbl_role: String,
    pub full_name: Option<String>,
    pub user_id: Option<String>,
}

// ========== REQUESTS ==========
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub wbl_role: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub wbl_role: Option<String>,
}

// ========== RESPONSES ==========
#[derive(Debug, Serialize)]
pub struct ProvisionedUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub wbl_role: String,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub success: bool,
    pub mode: &'static str, // created | invited
    pub user: ProvisionedUser,
}
