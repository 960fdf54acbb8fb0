//! Account administration endpoints (ADMIN only).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use stockroom_core::StockroomError;
use stockroom_core::models::user::{CreateUser, UpdateUser, User, UserRole};
use stockroom_core::repository::UserRepository;
use uuid::Uuid;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
) -> ApiResult<Json<Vec<User>>> {
    require_role(&ctx, &[UserRole::Admin])?;
    Ok(Json(state.users.list().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    ad_account: Option<String>,
}

#[derive(serde::Serialize)]
struct UserEnvelope {
    user: User,
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Json(body): Json<CreateBody>,
) -> ApiResult<(StatusCode, Json<UserEnvelope>)> {
    require_role(&ctx, &[UserRole::Admin])?;

    let name = body.name.as_deref().unwrap_or("").trim().to_string();
    let email = body
        .email
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let password = body.password.unwrap_or_default();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(StockroomError::validation("name, email and password are required").into());
    }

    if state.users.get_by_email(&email).await?.is_some() {
        return Err(StockroomError::conflict("email is already registered").into());
    }

    let user = state
        .users
        .create(CreateUser {
            name,
            email,
            password,
            role: body
                .role
                .as_deref()
                .map(UserRole::parse_or_viewer)
                .unwrap_or(UserRole::Viewer),
            ad_account: body
                .ad_account
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserEnvelope { user })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    role: Option<String>,
    ad_account: Option<String>,
    password: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<UserEnvelope>> {
    require_role(&ctx, &[UserRole::Admin])?;

    let target = state.users.get_by_id(id).await?;

    let next_role = body.role.as_deref().map(UserRole::parse_or_viewer);
    if let Some(next) = next_role {
        // At least one ADMIN must exist at all times.
        if target.role == UserRole::Admin
            && next != UserRole::Admin
            && state.users.count_by_role(UserRole::Admin).await? <= 1
        {
            return Err(StockroomError::precondition(
                "at least one active administrator is required",
            )
            .into());
        }
    }

    let user = state
        .users
        .update(
            id,
            UpdateUser {
                role: next_role,
                ad_account: body.ad_account.map(|v| {
                    let trimmed = v.trim().to_string();
                    if trimmed.is_empty() { None } else { Some(trimmed) }
                }),
                password: body.password.filter(|p| !p.is_empty()),
            },
        )
        .await?;

    Ok(Json(UserEnvelope { user }))
}

async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&ctx, &[UserRole::Admin])?;

    if ctx.id == id {
        return Err(StockroomError::precondition("cannot delete your own account").into());
    }

    let target = state.users.get_by_id(id).await?;
    if target.role == UserRole::Admin
        && state.users.count_by_role(UserRole::Admin).await? <= 1
    {
        return Err(StockroomError::precondition(
            "at least one active administrator is required",
        )
        .into());
    }

    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
