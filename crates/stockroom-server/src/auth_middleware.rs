//! JWT authentication middleware + role checking.
//!
//! Extracts the bearer token from `Authorization`, validates it, then
//! loads the account so role changes take effect immediately. The
//! authenticated user is stored in request extensions for handlers.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use stockroom_auth::token;
use stockroom_core::StockroomError;
use stockroom_core::models::user::{User, UserRole};
use stockroom_core::repository::UserRepository;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Authenticated request context, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

fn unauthorized(reason: &str) -> ApiError {
    ApiError(StockroomError::Unauthorized {
        reason: reason.into(),
    })
}

/// Check if a request path is public (no auth required).
///
/// Registration stays public because the very first account bootstraps
/// itself; the handler enforces the admin-only rule afterwards.
fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/api/auth/login" | "/api/auth/register")
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> ApiResult<AuthUser> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("missing bearer token"))?;

    let claims = token::validate_access_token(token, &state.auth_config)?;

    let user_id = Uuid::parse_str(&claims.0.sub)
        .map_err(|_| unauthorized("malformed token subject"))?;

    // Fresh lookup: a deleted account or changed role invalidates the
    // token's privileges right away.
    let user = state
        .users
        .get_by_id(user_id)
        .await
        .map_err(|_| unauthorized("account no longer exists"))?;

    Ok(AuthUser::from(user))
}

/// Middleware that authenticates every non-public request.
///
/// On public paths a valid token is still attached when present, so
/// handlers with optional authentication (registration) can see the
/// requester.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        if let Ok(user) = resolve_user(&state, request.headers()).await {
            request.extensions_mut().insert(user);
        }
        return Ok(next.run(request).await);
    }

    let user = resolve_user(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Reject the request unless the authenticated user holds one of the
/// allowed roles.
pub fn require_role(user: &AuthUser, allowed: &[UserRole]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError(StockroomError::Forbidden {
            reason: "insufficient role for this action".into(),
        }))
    }
}
