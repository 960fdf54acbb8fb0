//! External decommission act endpoints — standalone audit documents
//! for assets retired outside the system.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use stockroom_core::StockroomError;
use stockroom_core::models::external_act::{
    CreateExternalDecommissionAct, ExternalDecommissionAct,
};
use stockroom_core::models::user::UserRole;
use stockroom_core::repository::ExternalActRepository;
use uuid::Uuid;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::handlers::dispatch_guides::serve_attachment;
use crate::handlers::{FilePart, collect_multipart, parse_date_value};
use crate::state::AppState;

const ACT_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one))
        .route("/{id}/download", get(download))
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ExternalDecommissionAct>)> {
    require_role(&ctx, ACT_ROLES)?;

    let (fields, file) = collect_multipart(multipart, "actFile").await?;

    let inventory_manager = fields
        .get("inventoryManager")
        .map(|v| v.trim())
        .unwrap_or("");
    let product_name = fields.get("productName").map(|v| v.trim()).unwrap_or("");
    let operational_unit = fields
        .get("operationalUnit")
        .map(|v| v.trim())
        .unwrap_or("");
    let record_date = fields.get("recordDate").map(String::as_str).unwrap_or("");
    if inventory_manager.is_empty()
        || product_name.is_empty()
        || operational_unit.is_empty()
        || record_date.is_empty()
    {
        return Err(StockroomError::validation(
            "inventory manager, product, operational unit and record date are required",
        )
        .into());
    }
    let record_date = parse_date_value(record_date, "record date")?;

    let FilePart {
        file_name,
        content_type,
        bytes,
    } = file.ok_or_else(|| StockroomError::validation("the act document file is required"))?;

    let stored = state.uploads.save(&file_name, content_type, &bytes).await?;

    let act = state
        .acts
        .create(CreateExternalDecommissionAct {
            inventory_manager: inventory_manager.to_string(),
            product_name: product_name.to_string(),
            serial_number: fields
                .get("serialNumber")
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            operational_unit: operational_unit.to_string(),
            record_date,
            file_name: stored.file_name,
            stored_file_name: stored.stored_file_name,
            file_size: Some(stored.file_size),
            mime_type: stored.mime_type,
            uploaded_by: ctx.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(act)))
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ExternalDecommissionAct>>> {
    require_role(&ctx, ACT_ROLES)?;
    Ok(Json(state.acts.list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExternalDecommissionAct>> {
    require_role(&ctx, ACT_ROLES)?;
    Ok(Json(state.acts.get_by_id(id).await?))
}

async fn download(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    require_role(&ctx, ACT_ROLES)?;

    let act = state.acts.get_by_id(id).await?;
    let bytes = state
        .uploads
        .read(&act.stored_file_name)
        .await?
        .ok_or_else(|| StockroomError::not_found("stored file", &act.stored_file_name))?;

    serve_attachment(&act.file_name, act.mime_type.as_deref(), bytes)
}
