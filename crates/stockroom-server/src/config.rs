//! Server configuration, loaded from the environment.

use std::env;
use std::path::PathBuf;

use stockroom_auth::AuthConfig;
use stockroom_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },
}

/// Optional bootstrap administrator account, created at startup when
/// the email is not yet registered.
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Directory where uploaded documents are stored.
    pub upload_dir: PathBuf,
    /// JSON array seeding the simulated directory service.
    pub directory_users_json: Option<String>,
    pub seed_admin: Option<SeedAdmin>,
}

fn var(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a PEM either inline (`*_PEM`) or from a file (`*_FILE`).
fn pem_var(inline_key: &'static str, file_key: &'static str) -> Result<String, ConfigError> {
    if let Some(pem) = var(inline_key) {
        return Ok(pem);
    }
    let path = var(file_key).ok_or(ConfigError::Missing(inline_key))?;
    std::fs::read_to_string(&path).map_err(|source| ConfigError::KeyFile { path, source })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut db = DbConfig::default();
        if let Some(endpoint) = var("STOCKROOM_DB_ENDPOINT") {
            db.endpoint = endpoint;
        }
        if let Some(namespace) = var("STOCKROOM_DB_NAMESPACE") {
            db.namespace = namespace;
        }
        if let Some(database) = var("STOCKROOM_DB_DATABASE") {
            db.database = database;
        }
        if let Some(username) = var("STOCKROOM_DB_USERNAME") {
            db.username = username;
        }
        if let Some(password) = var("STOCKROOM_DB_PASSWORD") {
            db.password = password;
        }

        let mut auth = AuthConfig {
            jwt_private_key_pem: pem_var(
                "STOCKROOM_JWT_PRIVATE_KEY_PEM",
                "STOCKROOM_JWT_PRIVATE_KEY_FILE",
            )?,
            jwt_public_key_pem: pem_var(
                "STOCKROOM_JWT_PUBLIC_KEY_PEM",
                "STOCKROOM_JWT_PUBLIC_KEY_FILE",
            )?,
            ..AuthConfig::default()
        };
        if let Some(lifetime) = var("STOCKROOM_TOKEN_LIFETIME_SECS") {
            auth.token_lifetime_secs =
                lifetime
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        key: "STOCKROOM_TOKEN_LIFETIME_SECS",
                        message: e.to_string(),
                    })?;
        }
        if let Some(issuer) = var("STOCKROOM_JWT_ISSUER") {
            auth.jwt_issuer = issuer;
        }
        auth.pepper = var("STOCKROOM_PASSWORD_PEPPER");

        let seed_admin = match (
            var("STOCKROOM_SEED_ADMIN_EMAIL"),
            var("STOCKROOM_SEED_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                name: var("STOCKROOM_SEED_ADMIN_NAME").unwrap_or_else(|| "Administrator".into()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: var("STOCKROOM_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:4000".into()),
            db,
            auth,
            upload_dir: var("STOCKROOM_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            directory_users_json: var("STOCKROOM_DIRECTORY_USERS"),
            seed_admin,
        })
    }
}
