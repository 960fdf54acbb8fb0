//! Catalog endpoints for product models.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use stockroom_core::StockroomError;
use stockroom_core::models::product_model::{CreateProductModel, ProductModel};
use stockroom_core::models::user::UserRole;
use stockroom_core::repository::ProductModelRepository;
use uuid::Uuid;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::state::AppState;

const WRITE_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    name: Option<String>,
    description: Option<String>,
    part_number: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Json(body): Json<CreateBody>,
) -> ApiResult<(StatusCode, Json<ProductModel>)> {
    require_role(&ctx, WRITE_ROLES)?;

    let name = body.name.as_deref().unwrap_or("").trim().to_string();
    let part_number = body.part_number.as_deref().unwrap_or("").trim().to_string();
    if name.is_empty() || part_number.is_empty() {
        return Err(StockroomError::validation("name and part number are required").into());
    }

    let model = state
        .models
        .create(CreateProductModel {
            name,
            description: body
                .description
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            part_number,
            created_by: Some(ctx.id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(model)))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductModel>>> {
    Ok(Json(state.models.list().await?))
}

async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&ctx, WRITE_ROLES)?;
    // Referential guard lives in the repository.
    state.models.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
