//! Product domain model — a trackable asset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the asset entered the inventory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Purchased,
    Rental,
}

/// Lifecycle state of a product.
///
/// ```text
/// AVAILABLE --assign--> ASSIGNED --unassign--> AVAILABLE
/// AVAILABLE --decommission--> DECOMMISSIONED (terminal)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Available,
    Assigned,
    Decommissioned,
}

/// Denormalized copy of the active assignment, present iff the product
/// is ASSIGNED. The assignment log is the source of truth; this
/// snapshot must always be recomputable from the latest log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSnapshot {
    pub assigned_to: String,
    pub assigned_email: Option<String>,
    pub assigned_ad_account: Option<String>,
    pub location: String,
    pub assignment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub product_model_id: Uuid,
    /// Denormalized from the product model at creation/model-change time.
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// `true` for individually tracked units (serial number required),
    /// `false` for quantity-tracked stock (no serial, `quantity` >= 1).
    pub is_serialized: bool,
    pub serial_number: Option<String>,
    pub quantity: u32,
    /// Denormalized from the product model.
    pub part_number: String,
    pub inventory_number: Option<String>,
    pub rental_id: Option<String>,
    pub dispatch_guide_id: Uuid,
    pub status: ProductStatus,
    pub current_assignment: Option<AssignmentSnapshot>,
    pub decommission_reason: Option<String>,
    pub decommissioned_at: Option<DateTime<Utc>>,
    pub decommissioned_by: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Check the lifecycle invariant: exactly one of {assignment
    /// snapshot set, decommission fields set, neither} holds, matching
    /// `status`.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            ProductStatus::Available => {
                self.current_assignment.is_none() && self.decommission_reason.is_none()
            }
            ProductStatus::Assigned => {
                self.current_assignment.is_some() && self.decommission_reason.is_none()
            }
            ProductStatus::Decommissioned => {
                self.current_assignment.is_none()
                    && self.decommission_reason.is_some()
                    && self.decommissioned_at.is_some()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub product_model_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub is_serialized: bool,
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub part_number: String,
    pub inventory_number: Option<String>,
    pub rental_id: Option<String>,
    pub dispatch_guide_id: Uuid,
    pub created_by: Option<Uuid>,
}

/// Mutable-field updates. Products must stay attached to a dispatch
/// guide and a model, so those are plain `Option` (absent = no change);
/// the clearable fields use the nested form:
/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub description: Option<Option<String>>,
    pub serial_number: Option<String>,
    pub inventory_number: Option<Option<String>>,
    pub rental_id: Option<Option<String>>,
    pub dispatch_guide_id: Option<Uuid>,
    /// When the model changes, `name`, `part_number` and `description`
    /// are re-denormalized by the lifecycle service before this update
    /// is applied.
    pub product_model_id: Option<Uuid>,
    pub name: Option<String>,
    pub part_number: Option<String>,
}

/// Query filter for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub product_type: Option<ProductType>,
    /// Empty = all statuses.
    pub statuses: Vec<ProductStatus>,
    /// Case-insensitive substring over name, serial number, part
    /// number, inventory number and rental id.
    pub search: Option<String>,
}

/// Per-model aggregate used by the stock overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub product_model_id: Uuid,
    pub name: String,
    pub part_number: String,
    pub description: Option<String>,
    pub totals: StockTotals,
    pub type_breakdown: TypeBreakdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockTotals {
    pub total: u64,
    pub available: u64,
    pub assigned: u64,
    pub decommissioned: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub purchased: u64,
    pub rental: u64,
}
