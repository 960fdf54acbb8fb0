//! Authentication error types.

use stockroom_core::error::StockroomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for StockroomError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => StockroomError::Unauthorized {
                reason: err.to_string(),
            },
            AuthError::PasswordTooShort(_) => StockroomError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => StockroomError::Internal(msg),
        }
    }
}
