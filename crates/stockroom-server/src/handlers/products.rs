//! Product endpoints: catalog intake, lifecycle transitions, history,
//! and the stock overview.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockroom_core::StockroomError;
use stockroom_core::lifecycle::{AssignRequest, NewProduct, NewProductBatch, UnassignRequest};
use stockroom_core::models::assignment::Assignment;
use stockroom_core::models::product::{
    Product, ProductFilter, ProductStatus, ProductType, StockSummary, UpdateProduct,
};
use stockroom_core::models::user::UserRole;
use uuid::Uuid;

use crate::auth_middleware::{AuthUser, require_role};
use crate::error::ApiResult;
use crate::state::AppState;

const WRITE_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Manager];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/bulk", post(create_bulk))
        .route("/stock", get(stock))
        .route("/{id}", get(get_one).put(update).delete(remove))
        .route("/{id}/assign", post(assign))
        .route("/{id}/unassign", post(unassign))
        .route("/{id}/decommission", post(decommission))
        .route("/{id}/assignments", get(history))
        .route("/{id}/assignments/rebuild", post(rebuild_snapshot))
}

fn parse_product_type(value: &str) -> ApiResult<ProductType> {
    match value.trim().to_uppercase().as_str() {
        "PURCHASED" => Ok(ProductType::Purchased),
        "RENTAL" => Ok(ProductType::Rental),
        _ => Err(StockroomError::validation("invalid product type").into()),
    }
}

fn parse_body_id(value: Option<&str>, what: &str) -> ApiResult<Uuid> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StockroomError::validation(format!("{what} is required")))?;
    Uuid::parse_str(raw).map_err(|_| StockroomError::validation(format!("invalid {what}")).into())
}

// -- creation ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    product_model_id: Option<String>,
    #[serde(rename = "type")]
    product_type: Option<String>,
    is_serialized: Option<bool>,
    serial_number: Option<String>,
    quantity: Option<u32>,
    inventory_number: Option<String>,
    rental_id: Option<String>,
    dispatch_guide_id: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Json(body): Json<CreateBody>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    require_role(&ctx, WRITE_ROLES)?;

    let product_type = match body.product_type.as_deref() {
        Some(value) => parse_product_type(value)?,
        None => return Err(StockroomError::validation("product type is required").into()),
    };

    let product = state
        .lifecycle
        .create(
            NewProduct {
                product_model_id: parse_body_id(body.product_model_id.as_deref(), "product model id")?,
                product_type,
                is_serialized: body.is_serialized.unwrap_or(true),
                serial_number: body.serial_number,
                quantity: body.quantity.unwrap_or(1),
                inventory_number: body.inventory_number,
                rental_id: body.rental_id,
                dispatch_guide_id: parse_body_id(
                    body.dispatch_guide_id.as_deref(),
                    "dispatch guide id",
                )?,
            },
            ctx.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkBody {
    product_model_id: Option<String>,
    #[serde(rename = "type")]
    product_type: Option<String>,
    serial_numbers: Option<Vec<String>>,
    rental_id: Option<String>,
    dispatch_guide_id: Option<String>,
}

#[derive(Serialize)]
struct BulkResponse {
    products: Vec<Product>,
}

async fn create_bulk(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Json(body): Json<BulkBody>,
) -> ApiResult<(StatusCode, Json<BulkResponse>)> {
    require_role(&ctx, WRITE_ROLES)?;

    let product_type = match body.product_type.as_deref() {
        Some(value) => parse_product_type(value)?,
        None => return Err(StockroomError::validation("product type is required").into()),
    };

    let products = state
        .lifecycle
        .create_bulk(
            NewProductBatch {
                product_model_id: parse_body_id(body.product_model_id.as_deref(), "product model id")?,
                product_type,
                serial_numbers: body.serial_numbers.unwrap_or_default(),
                rental_id: body.rental_id,
                dispatch_guide_id: parse_body_id(
                    body.dispatch_guide_id.as_deref(),
                    "dispatch guide id",
                )?,
            },
            ctx.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BulkResponse { products })))
}

// -- listings ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    product_type: Option<String>,
    /// Comma-separated; unknown values are ignored.
    status: Option<String>,
    search: Option<String>,
}

fn parse_status_list(raw: &str) -> Vec<ProductStatus> {
    raw.split(',')
        .filter_map(|value| match value.trim().to_uppercase().as_str() {
            "AVAILABLE" => Some(ProductStatus::Available),
            "ASSIGNED" => Some(ProductStatus::Assigned),
            "DECOMMISSIONED" => Some(ProductStatus::Decommissioned),
            _ => None,
        })
        .collect()
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    // Invalid filter values fall through unfiltered rather than
    // rejecting the request.
    let filter = ProductFilter {
        product_type: query
            .product_type
            .as_deref()
            .and_then(|v| parse_product_type(v).ok()),
        statuses: query
            .status
            .as_deref()
            .map(parse_status_list)
            .unwrap_or_default(),
        search: query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    };

    let products = state.lifecycle.list(filter).await?;
    Ok(Json(products))
}

async fn stock(State(state): State<AppState>) -> ApiResult<Json<Vec<StockSummary>>> {
    Ok(Json(state.lifecycle.stock_summary().await?))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.lifecycle.get(id).await?))
}

// -- edits ------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody {
    description: Option<String>,
    serial_number: Option<String>,
    inventory_number: Option<String>,
    rental_id: Option<String>,
    dispatch_guide_id: Option<String>,
    product_model_id: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<Product>> {
    require_role(&ctx, WRITE_ROLES)?;

    // An empty string clears the clearable fields.
    let clearable = |value: Option<String>| {
        value.map(|v| {
            let trimmed = v.trim().to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        })
    };

    let input = UpdateProduct {
        description: clearable(body.description),
        serial_number: body.serial_number,
        inventory_number: clearable(body.inventory_number),
        rental_id: clearable(body.rental_id),
        dispatch_guide_id: body
            .dispatch_guide_id
            .as_deref()
            .map(|raw| parse_body_id(Some(raw), "dispatch guide id"))
            .transpose()?,
        product_model_id: body
            .product_model_id
            .as_deref()
            .map(|raw| parse_body_id(Some(raw), "product model id"))
            .transpose()?,
        name: None,
        part_number: None,
    };

    if input.description.is_none()
        && input.serial_number.is_none()
        && input.inventory_number.is_none()
        && input.rental_id.is_none()
        && input.dispatch_guide_id.is_none()
        && input.product_model_id.is_none()
    {
        return Err(StockroomError::validation("no valid fields to update").into());
    }

    Ok(Json(state.lifecycle.update(id, input).await?))
}

// -- lifecycle transitions --------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    assigned_to: Option<String>,
    assigned_email: Option<String>,
    assigned_to_ad_account: Option<String>,
    location: Option<String>,
    assignment_date: Option<DateTime<Utc>>,
    notes: Option<String>,
}

#[derive(Serialize)]
struct TransitionResponse {
    product: Product,
    assignment: Assignment,
}

async fn assign(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignBody>,
) -> ApiResult<Json<TransitionResponse>> {
    require_role(&ctx, WRITE_ROLES)?;

    // When only a directory account is given, enrich the contact from
    // the directory entry.
    let mut assigned_email = body.assigned_email;
    if assigned_email.is_none() {
        if let Some(account) = body.assigned_to_ad_account.as_deref() {
            if let Some(entry) = state.directory.find_by_account(account) {
                assigned_email = Some(entry.email);
            }
        }
    }

    let outcome = state
        .lifecycle
        .assign(
            id,
            AssignRequest {
                assigned_to: body.assigned_to.unwrap_or_default(),
                assigned_email,
                assigned_ad_account: body.assigned_to_ad_account,
                location: body.location.unwrap_or_default(),
                assignment_date: body.assignment_date,
                notes: body.notes,
            },
            ctx.id,
        )
        .await?;

    Ok(Json(TransitionResponse {
        product: outcome.product,
        assignment: outcome.assignment,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnassignBody {
    location: Option<String>,
    assignment_date: Option<DateTime<Utc>>,
    notes: Option<String>,
}

async fn unassign(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<UnassignBody>>,
) -> ApiResult<Json<TransitionResponse>> {
    require_role(&ctx, WRITE_ROLES)?;

    let body = body.map(|Json(b)| b).unwrap_or(UnassignBody {
        location: None,
        assignment_date: None,
        notes: None,
    });

    let outcome = state
        .lifecycle
        .unassign(
            id,
            UnassignRequest {
                location: body.location,
                assignment_date: body.assignment_date,
                notes: body.notes,
            },
            ctx.id,
        )
        .await?;

    Ok(Json(TransitionResponse {
        product: outcome.product,
        assignment: outcome.assignment,
    }))
}

#[derive(Debug, Deserialize)]
struct DecommissionBody {
    reason: Option<String>,
}

async fn decommission(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecommissionBody>,
) -> ApiResult<Json<Product>> {
    require_role(&ctx, WRITE_ROLES)?;
    let product = state
        .lifecycle
        .decommission(id, body.reason.as_deref().unwrap_or(""), ctx.id)
        .await?;
    Ok(Json(product))
}

async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_role(&ctx, WRITE_ROLES)?;
    state.lifecycle.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- history ----------------------------------------------------------------

async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Assignment>>> {
    Ok(Json(state.lifecycle.history(id).await?))
}

/// Repair endpoint: recompute the denormalized snapshot from the
/// assignment log.
async fn rebuild_snapshot(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    require_role(&ctx, &[UserRole::Admin])?;
    Ok(Json(state.lifecycle.rebuild_snapshot(id).await?))
}
