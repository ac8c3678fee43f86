use serde::{Deserialize, Serialize};

/// Roles a user can hold in the restaurant system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Kitchen,
    Client,
    Waiter,
}

impl UserRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Kitchen => "Kitchen",
            UserRole::Client => "Client",
            UserRole::Waiter => "Waiter",
        }
    }

    /// Staff roles work shifts; clients sit at tables.
    pub fn is_staff(&self) -> bool {
        !matches!(self, UserRole::Client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Identity returned by `GET /api/v1/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub role: UserRole,
    #[serde(default)]
    pub table_id: Option<i64>,
    #[serde(default)]
    pub is_currently_working: bool,
}

impl UserResponse {
    /// One-line summary, e.g. "waiter1 (Waiter, table 4)"
    pub fn summary(&self) -> String {
        match self.table_id {
            Some(table) => format!("{} ({}, table {})", self.username, self.role.display_name(), table),
            None => format!("{} ({})", self.username, self.role.display_name()),
        }
    }
}

/// Response from `POST /api/v1/auth/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<UserResponse>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body for `POST /api/v1/auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i32>,
}
