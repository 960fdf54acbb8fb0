//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Viewer,
}

impl UserRole {
    /// Resolve a role string; anything unknown falls back to VIEWER.
    pub fn parse_or_viewer(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => UserRole::Admin,
            "MANAGER" => UserRole::Manager,
            _ => UserRole::Viewer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Stored lowercase; unique across all users.
    pub email: String,
    /// Never serialized onto the wire.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub ad_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub role: UserRole,
    pub ad_account: Option<String>,
}

/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub role: Option<UserRole>,
    pub ad_account: Option<Option<String>>,
    /// Raw password; hashed before storage.
    pub password: Option<String>,
}
