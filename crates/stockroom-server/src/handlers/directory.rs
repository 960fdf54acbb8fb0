//! Simulated corporate-directory endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use stockroom_core::directory::DirectoryUser;
use stockroom_core::models::user::UserRole;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/mock/sync", post(sync))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
) -> ApiResult<Json<Vec<DirectoryUser>>> {
    require_role(&ctx, &[UserRole::Admin, UserRole::Manager])?;
    Ok(Json(state.directory.list()))
}

#[derive(Debug, Deserialize)]
struct SyncBody {
    users: Option<Vec<DirectoryUser>>,
}

async fn sync(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Json(body): Json<SyncBody>,
) -> ApiResult<Json<Vec<DirectoryUser>>> {
    require_role(&ctx, &[UserRole::Admin])?;
    Ok(Json(state.directory.sync(body.users.unwrap_or_default())))
}
