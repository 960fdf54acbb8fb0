//! Simulated corporate-directory lookup.
//!
//! In a production deployment this would talk to LDAP or a graph API;
//! here it serves a configured entry list. The service is explicitly
//! constructed and injected — it owns its state instead of living in a
//! process-wide singleton.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{StockroomError, StockroomResult};

/// One directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub account: String,
    pub department: String,
}

/// Injected directory lookup service.
pub struct DirectoryService {
    users: RwLock<Vec<DirectoryUser>>,
}

impl DirectoryService {
    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// Build from a JSON array (the configured seed list).
    pub fn from_json(json: &str) -> StockroomResult<Self> {
        let users: Vec<DirectoryUser> = serde_json::from_str(json).map_err(|e| {
            StockroomError::validation(format!("invalid directory user list: {e}"))
        })?;
        Ok(Self::with_users(users))
    }

    pub fn list(&self) -> Vec<DirectoryUser> {
        self.users.read().expect("directory lock poisoned").clone()
    }

    /// Case-insensitive lookup by account name.
    pub fn find_by_account(&self, account: &str) -> Option<DirectoryUser> {
        let normalized = account.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.users
            .read()
            .expect("directory lock poisoned")
            .iter()
            .find(|u| u.account.to_lowercase() == normalized)
            .cloned()
    }

    /// Replace the whole entry list; empty input leaves it unchanged.
    pub fn sync(&self, users: Vec<DirectoryUser>) -> Vec<DirectoryUser> {
        let mut guard = self.users.write().expect("directory lock poisoned");
        if !users.is_empty() {
            *guard = users;
        }
        guard.clone()
    }
}

impl Default for DirectoryService {
    fn default() -> Self {
        Self::with_users(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(account: &str) -> DirectoryUser {
        DirectoryUser {
            id: format!("dir-{account}"),
            display_name: account.to_uppercase(),
            email: format!("{account}@example.com"),
            account: account.to_string(),
            department: "IT".into(),
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let dir = DirectoryService::with_users(vec![entry("jperez")]);
        assert!(dir.find_by_account("JPerez").is_some());
        assert!(dir.find_by_account("unknown").is_none());
        assert!(dir.find_by_account("  ").is_none());
    }

    #[test]
    fn sync_ignores_empty_replacement() {
        let dir = DirectoryService::with_users(vec![entry("a")]);
        let after = dir.sync(Vec::new());
        assert_eq!(after.len(), 1);

        let after = dir.sync(vec![entry("b"), entry("c")]);
        assert_eq!(after.len(), 2);
        assert!(dir.find_by_account("a").is_none());
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(DirectoryService::from_json("not json").is_err());
        let dir = DirectoryService::from_json(
            r#"[{"id":"1","displayName":"Ana","email":"ana@x.cl","account":"ana","department":"Ops"}]"#,
        )
        .unwrap();
        assert_eq!(dir.list().len(), 1);
    }
}
