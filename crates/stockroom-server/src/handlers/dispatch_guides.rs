//! Dispatch guide endpoints: multipart intake, listing, download, and
//! guarded deletion.

use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use stockroom_core::StockroomError;
use stockroom_core::models::dispatch_guide::{CreateDispatchGuide, DispatchGuide};
use stockroom_core::models::user::UserRole;
use stockroom_core::repository::DispatchGuideRepository;
use uuid::Uuid;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::handlers::{FilePart, collect_multipart, parse_date_value};
use crate::state::AppState;

const GUIDE_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one).delete(remove))
        .route("/{id}/download", get(download))
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DispatchGuide>)> {
    require_role(&ctx, GUIDE_ROLES)?;

    let (fields, file) = collect_multipart(multipart, "guideFile").await?;

    let guide_number = fields.get("guideNumber").map(|v| v.trim()).unwrap_or("");
    let vendor = fields.get("vendor").map(|v| v.trim()).unwrap_or("");
    let dispatch_date = fields.get("dispatchDate").map(String::as_str).unwrap_or("");
    if guide_number.is_empty() || vendor.is_empty() || dispatch_date.is_empty() {
        return Err(StockroomError::validation(
            "guide number, vendor and dispatch date are required",
        )
        .into());
    }
    let dispatch_date = parse_date_value(dispatch_date, "dispatch date")?;

    let FilePart {
        file_name,
        content_type,
        bytes,
    } = file.ok_or_else(|| StockroomError::validation("the guide document file is required"))?;

    // Number must be free before the file lands on disk.
    if state.guides.get_by_number(guide_number).await?.is_some() {
        return Err(StockroomError::conflict(format!(
            "a dispatch guide with number {guide_number} already exists"
        ))
        .into());
    }

    let stored = state.uploads.save(&file_name, content_type, &bytes).await?;

    let guide = state
        .guides
        .create(CreateDispatchGuide {
            guide_number: guide_number.to_string(),
            vendor: vendor.to_string(),
            dispatch_date,
            file_name: stored.file_name,
            stored_file_name: stored.stored_file_name,
            file_size: Some(stored.file_size),
            mime_type: stored.mime_type,
            uploaded_by: ctx.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(guide)))
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
) -> ApiResult<Json<Vec<DispatchGuide>>> {
    require_role(&ctx, GUIDE_ROLES)?;
    Ok(Json(state.guides.list().await?))
}

async fn get_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DispatchGuide>> {
    require_role(&ctx, GUIDE_ROLES)?;
    Ok(Json(state.guides.get_by_id(id).await?))
}

async fn download(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    require_role(&ctx, GUIDE_ROLES)?;

    let guide = state.guides.get_by_id(id).await?;
    let bytes = state
        .uploads
        .read(&guide.stored_file_name)
        .await?
        .ok_or_else(|| StockroomError::not_found("stored file", &guide.stored_file_name))?;

    serve_attachment(&guide.file_name, guide.mime_type.as_deref(), bytes)
}

async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&ctx, GUIDE_ROLES)?;

    let guide = state.guides.get_by_id(id).await?;
    // The repository rejects deletion while products reference the
    // guide, so the file is only removed after that guard passed.
    state.guides.delete(id).await?;
    state.uploads.remove(&guide.stored_file_name).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Build an attachment response with the original filename.
pub(crate) fn serve_attachment(
    file_name: &str,
    mime_type: Option<&str>,
    bytes: Vec<u8>,
) -> ApiResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            mime_type.unwrap_or("application/octet-stream"),
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "_")),
        )
        .body(bytes.into())
        .map_err(|e| StockroomError::Internal(format!("response build: {e}")).into())
}
