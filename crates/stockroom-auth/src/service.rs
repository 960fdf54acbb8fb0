//! Authentication service — login and account registration.

use stockroom_core::error::{StockroomError, StockroomResult};
use stockroom_core::models::user::{CreateUser, User, UserRole};
use stockroom_core::repository::UserRepository;
use tracing::info;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the registration flow.
#[derive(Debug)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Requested role; unknown values resolve to VIEWER.
    pub role: Option<String>,
    pub ad_account: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub token: String,
    /// The authenticated account.
    pub user: User,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Authentication service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U: UserRepository> {
    users: U,
    config: AuthConfig,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(users: U, config: AuthConfig) -> Self {
        Self { users, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate with email + password and issue an access token.
    pub async fn login(&self, email: &str, password: &str) -> StockroomResult<LoginOutput> {
        // 1. Look up the account; unknown emails fail the same way as
        //    bad passwords.
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // 2. Verify password.
        let valid = password::verify_password(
            password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Issue the access token.
        let token = token::issue_access_token(&user, &self.config)?;

        info!(user_id = %user.id, "login");
        Ok(LoginOutput {
            token,
            user,
            expires_in: self.config.token_lifetime_secs,
        })
    }

    /// Register an account.
    ///
    /// The very first account ever created becomes ADMIN regardless of
    /// the requested role (bootstrap). Afterwards only an ADMIN
    /// requester may register accounts, and unknown role strings
    /// resolve to VIEWER.
    pub async fn register(
        &self,
        input: RegisterInput,
        requester: Option<&User>,
    ) -> StockroomResult<User> {
        // 1. Field validation.
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(StockroomError::validation(
                "name, email and password are required",
            ));
        }
        password::check_policy(&input.password, self.config.min_password_length)?;

        // 2. Email must be free.
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(StockroomError::conflict("email is already registered"));
        }

        // 3. Bootstrap rule + role resolution.
        let total = self.users.count().await?;
        let role = if total == 0 {
            UserRole::Admin
        } else {
            match requester {
                Some(user) if user.role == UserRole::Admin => input
                    .role
                    .as_deref()
                    .map(UserRole::parse_or_viewer)
                    .unwrap_or(UserRole::Viewer),
                _ => {
                    return Err(StockroomError::Forbidden {
                        reason: "only administrators can register additional accounts".into(),
                    });
                }
            }
        };

        // 4. Create the account (the repository hashes the password).
        let user = self
            .users
            .create(CreateUser {
                name,
                email,
                password: input.password,
                role,
                ad_account: input
                    .ad_account
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            })
            .await?;

        info!(user_id = %user.id, role = ?user.role, "account registered");
        Ok(user)
    }
}
