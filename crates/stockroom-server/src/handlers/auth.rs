//! Authentication endpoints: registration, login, profile.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use stockroom_auth::RegisterInput;
use stockroom_core::models::user::User;
use stockroom_core::repository::UserRepository;

use crate::auth_middleware::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    ad_account: Option<String>,
}

#[derive(Serialize)]
struct UserEnvelope {
    user: User,
}

async fn register(
    State(state): State<AppState>,
    requester: Option<Extension<AuthUser>>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(axum::http::StatusCode, Json<UserEnvelope>)> {
    // The registration handler only has the lightweight auth context;
    // fetch the full account when a requester is present.
    let requester_user = match requester {
        Some(Extension(ctx)) => Some(state.users.get_by_id(ctx.id).await?),
        None => None,
    };

    let user = state
        .auth
        .register(
            RegisterInput {
                name: body.name.unwrap_or_default(),
                email: body.email.unwrap_or_default(),
                password: body.password.unwrap_or_default(),
                role: body.role,
                ad_account: body.ad_account,
            },
            requester_user.as_ref(),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(UserEnvelope { user }),
    ))
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Json<LoginResponse>> {
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(stockroom_core::StockroomError::validation(
            "email and password are required",
        )
        .into());
    }

    let output = state.auth.login(&email, &password).await?;
    Ok(Json(LoginResponse {
        token: output.token,
        user: output.user,
        expires_in: output.expires_in,
    }))
}

async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
) -> ApiResult<Json<UserEnvelope>> {
    let user = state.users.get_by_id(ctx.id).await?;
    Ok(Json(UserEnvelope { user }))
}
