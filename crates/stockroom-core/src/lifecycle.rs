//! Product lifecycle service — the state machine over
//! `Product.status` and its assignment history.
//!
//! ```text
//! AVAILABLE --assign--> ASSIGNED --unassign--> AVAILABLE
//! AVAILABLE --decommission--> DECOMMISSIONED (terminal)
//! ASSIGNED  --decommission--> rejected (must unassign first)
//! ```
//!
//! Every transition is checked in application code for a precise error
//! message, then applied through a guarded store update so that racing
//! transitions against the same product serialize at the store layer:
//! the losing racer observes `PreconditionFailed` instead of silently
//! corrupting the snapshot. History records are appended only after
//! the guarded update succeeded, so a lost race leaves no record.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::{StockroomError, StockroomResult};
use crate::models::assignment::{Assignment, AssignmentAction, CreateAssignment};
use crate::models::product::{
    AssignmentSnapshot, CreateProduct, Product, ProductFilter, ProductStatus, ProductType,
    StockSummary, UpdateProduct,
};
use crate::repository::{
    AssignmentRepository, DispatchGuideRepository, ProductModelRepository, ProductRepository,
};

/// Input for single-product creation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_model_id: Uuid,
    pub product_type: ProductType,
    pub is_serialized: bool,
    pub serial_number: Option<String>,
    pub quantity: u32,
    pub inventory_number: Option<String>,
    pub rental_id: Option<String>,
    pub dispatch_guide_id: Uuid,
}

/// Input for bulk creation: one model + type, many serials.
#[derive(Debug, Clone)]
pub struct NewProductBatch {
    pub product_model_id: Uuid,
    pub product_type: ProductType,
    pub serial_numbers: Vec<String>,
    pub rental_id: Option<String>,
    pub dispatch_guide_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub assigned_to: String,
    pub assigned_email: Option<String>,
    pub assigned_ad_account: Option<String>,
    pub location: String,
    /// Defaults to the current time when absent.
    pub assignment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UnassignRequest {
    /// Overrides the snapshot location when present.
    pub location: Option<String>,
    pub assignment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Product + the history record the operation produced.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub product: Product,
    pub assignment: Assignment,
}

/// Orchestrates product lifecycle transitions.
///
/// Generic over repository implementations so that the core logic has
/// no dependency on the database crate.
pub struct ProductLifecycle<P, A, G, M> {
    products: P,
    assignments: A,
    guides: G,
    models: M,
}

impl<P, A, G, M> ProductLifecycle<P, A, G, M>
where
    P: ProductRepository,
    A: AssignmentRepository,
    G: DispatchGuideRepository,
    M: ProductModelRepository,
{
    pub fn new(products: P, assignments: A, guides: G, models: M) -> Self {
        Self {
            products,
            assignments,
            guides,
            models,
        }
    }

    // -- creation ----------------------------------------------------------

    /// Create one product under a dispatch guide.
    pub async fn create(
        &self,
        input: NewProduct,
        actor: Uuid,
    ) -> StockroomResult<Product> {
        // 1. Field validation.
        let serial = normalize_optional(&input.serial_number);
        let rental_id = normalize_optional(&input.rental_id);

        if input.is_serialized {
            if serial.is_none() {
                return Err(StockroomError::validation(
                    "serialized products require a serial number",
                ));
            }
        } else {
            if serial.is_some() {
                return Err(StockroomError::validation(
                    "quantity-tracked products cannot carry a serial number",
                ));
            }
            if input.quantity == 0 {
                return Err(StockroomError::validation("quantity must be at least 1"));
            }
        }

        if input.product_type == ProductType::Rental && rental_id.is_none() {
            return Err(StockroomError::validation(
                "rental products require a rental id",
            ));
        }

        // 2. Referenced records must exist.
        let model = self.models.get_by_id(input.product_model_id).await?;
        let guide = self.guides.get_by_id(input.dispatch_guide_id).await?;

        // 3. Sparse serial uniqueness.
        if let Some(serial) = &serial {
            if self.products.find_by_serial(serial).await?.is_some() {
                return Err(StockroomError::conflict(format!(
                    "a product with serial number {serial} already exists"
                )));
            }
        }

        // 4. Insert with the model's catalog data denormalized.
        let product = self
            .products
            .create(CreateProduct {
                product_model_id: model.id,
                name: model.name,
                description: model.description,
                product_type: input.product_type,
                is_serialized: input.is_serialized,
                serial_number: serial,
                quantity: if input.is_serialized { 1 } else { input.quantity },
                part_number: model.part_number,
                inventory_number: match input.product_type {
                    ProductType::Purchased => normalize_optional(&input.inventory_number),
                    ProductType::Rental => None,
                },
                rental_id: match input.product_type {
                    ProductType::Rental => rental_id,
                    ProductType::Purchased => None,
                },
                dispatch_guide_id: guide.id,
                created_by: Some(actor),
            })
            .await?;

        info!(product_id = %product.id, serial = ?product.serial_number, "product created");
        Ok(product)
    }

    /// Create many serialized products in one batch.
    ///
    /// The whole batch is validated before the first write: an empty or
    /// duplicated serial set, or a serial already present in the store,
    /// rejects the batch with the offending values in the message and
    /// zero rows inserted.
    pub async fn create_bulk(
        &self,
        input: NewProductBatch,
        actor: Uuid,
    ) -> StockroomResult<Vec<Product>> {
        // 1. Sanitize serials: trim, drop empties.
        let serials = sanitize_serials(&input.serial_numbers);
        if serials.is_empty() {
            return Err(StockroomError::validation(
                "at least one serial number is required",
            ));
        }

        // 2. No duplicates within the batch.
        let duplicated = duplicated_serials(&serials);
        if !duplicated.is_empty() {
            return Err(StockroomError::validation(format!(
                "duplicated serial numbers in request: {}",
                duplicated.join(", ")
            )));
        }

        let rental_id = normalize_optional(&input.rental_id);
        if input.product_type == ProductType::Rental && rental_id.is_none() {
            return Err(StockroomError::validation(
                "rental products require a rental id",
            ));
        }

        // 3. Referenced records must exist.
        let model = self.models.get_by_id(input.product_model_id).await?;
        let guide = self.guides.get_by_id(input.dispatch_guide_id).await?;

        // 4. No collisions with serials already in the store.
        let existing = self.products.existing_serials(&serials).await?;
        if !existing.is_empty() {
            return Err(StockroomError::conflict(format!(
                "products already registered with serial numbers: {}",
                existing.join(", ")
            )));
        }

        // 5. Insert all rows sharing the same guide and type.
        let inputs = serials
            .into_iter()
            .map(|serial| CreateProduct {
                product_model_id: model.id,
                name: model.name.clone(),
                description: model.description.clone(),
                product_type: input.product_type,
                is_serialized: true,
                serial_number: Some(serial),
                quantity: 1,
                part_number: model.part_number.clone(),
                inventory_number: None,
                rental_id: rental_id.clone(),
                dispatch_guide_id: guide.id,
                created_by: Some(actor),
            })
            .collect::<Vec<_>>();

        let products = self.products.create_many(inputs).await?;
        info!(count = products.len(), guide_id = %guide.id, "bulk product intake");
        Ok(products)
    }

    // -- transitions -------------------------------------------------------

    /// Hand the product to a person/location.
    pub async fn assign(
        &self,
        product_id: Uuid,
        request: AssignRequest,
        actor: Uuid,
    ) -> StockroomResult<TransitionOutcome> {
        // 1. Field validation.
        let assigned_to = require_trimmed(&request.assigned_to, "assignee name is required")?;
        let location = require_trimmed(&request.location, "location is required")?;
        let assigned_email = normalize_optional(&request.assigned_email);
        let assigned_ad_account = normalize_optional(&request.assigned_ad_account);
        if assigned_email.is_none() && assigned_ad_account.is_none() {
            return Err(StockroomError::validation(
                "an assignee email or directory account is required",
            ));
        }

        // 2. Precondition checks (precise error messages).
        let product = self.products.get_by_id(product_id).await?;
        match product.status {
            ProductStatus::Decommissioned => {
                return Err(StockroomError::precondition(
                    "product is decommissioned and cannot be assigned",
                ));
            }
            ProductStatus::Assigned => {
                return Err(StockroomError::precondition(
                    "product must be released before it can be assigned again",
                ));
            }
            ProductStatus::Available if product.current_assignment.is_some() => {
                return Err(StockroomError::precondition(
                    "product must be released before it can be assigned again",
                ));
            }
            ProductStatus::Available => {}
        }
        if !product.is_serialized {
            return Err(StockroomError::precondition(
                "quantity-tracked stock cannot be assigned to a person",
            ));
        }

        let assignment_date = request.assignment_date.unwrap_or_else(Utc::now);
        let snapshot = AssignmentSnapshot {
            assigned_to: assigned_to.clone(),
            assigned_email: assigned_email.clone(),
            assigned_ad_account: assigned_ad_account.clone(),
            location: location.clone(),
            assignment_date,
        };

        // 3. Guarded transition; a concurrent winner makes this fail.
        let updated = self
            .products
            .mark_assigned(product_id, snapshot)
            .await?
            .ok_or_else(|| {
                StockroomError::precondition(
                    "product must be released before it can be assigned again",
                )
            })?;

        // 4. Append the history record for the committed transition.
        let assignment = self
            .assignments
            .append(CreateAssignment {
                product_id,
                action: AssignmentAction::Assign,
                assigned_to,
                assigned_email,
                assigned_ad_account,
                location,
                assignment_date,
                performed_by: actor,
                notes: normalize_optional(&request.notes),
            })
            .await?;

        info!(product_id = %product_id, assigned_to = %assignment.assigned_to, "product assigned");
        Ok(TransitionOutcome {
            product: updated,
            assignment,
        })
    }

    /// Reclaim the product from its current holder.
    pub async fn unassign(
        &self,
        product_id: Uuid,
        request: UnassignRequest,
        actor: Uuid,
    ) -> StockroomResult<TransitionOutcome> {
        // 1. Precondition checks.
        let product = self.products.get_by_id(product_id).await?;
        if product.status == ProductStatus::Decommissioned {
            return Err(StockroomError::precondition("product is decommissioned"));
        }
        let Some(snapshot) = product.current_assignment else {
            return Err(StockroomError::precondition(
                "product has no active assignment",
            ));
        };

        // 2. Guarded transition back to AVAILABLE.
        let updated = self
            .products
            .mark_available(product_id)
            .await?
            .ok_or_else(|| StockroomError::precondition("product has no active assignment"))?;

        // 3. Record the release, copying identity fields from the
        //    snapshot; the location may be overridden by the caller.
        let location = normalize_optional(&request.location).unwrap_or(snapshot.location);
        let assignment = self
            .assignments
            .append(CreateAssignment {
                product_id,
                action: AssignmentAction::Unassign,
                assigned_to: snapshot.assigned_to,
                assigned_email: snapshot.assigned_email,
                assigned_ad_account: snapshot.assigned_ad_account,
                location,
                assignment_date: request.assignment_date.unwrap_or_else(Utc::now),
                performed_by: actor,
                notes: normalize_optional(&request.notes),
            })
            .await?;

        info!(product_id = %product_id, "product released");
        Ok(TransitionOutcome {
            product: updated,
            assignment,
        })
    }

    /// Permanently retire the product with a recorded reason.
    pub async fn decommission(
        &self,
        product_id: Uuid,
        reason: &str,
        actor: Uuid,
    ) -> StockroomResult<Product> {
        // 1. Field validation.
        let reason = require_trimmed(reason, "a decommission reason is required")?;

        // 2. Precondition checks.
        let product = self.products.get_by_id(product_id).await?;
        if product.status == ProductStatus::Decommissioned {
            return Err(StockroomError::precondition(
                "product is already decommissioned",
            ));
        }
        if product.status == ProductStatus::Assigned || product.current_assignment.is_some() {
            return Err(StockroomError::precondition(
                "product must be released before it can be decommissioned",
            ));
        }

        // 3. Guarded terminal transition.
        let updated = self
            .products
            .mark_decommissioned(product_id, reason, Utc::now(), actor)
            .await?
            .ok_or_else(|| {
                StockroomError::precondition(
                    "product must be released before it can be decommissioned",
                )
            })?;

        info!(product_id = %product_id, "product decommissioned");
        Ok(updated)
    }

    /// Remove the product and its whole assignment history.
    pub async fn delete(&self, product_id: Uuid) -> StockroomResult<()> {
        let product = self.products.get_by_id(product_id).await?;
        if product.status == ProductStatus::Assigned || product.current_assignment.is_some() {
            return Err(StockroomError::precondition(
                "product must be released before it can be deleted",
            ));
        }

        let removed = self.assignments.delete_by_product(product_id).await?;
        self.products.delete(product_id).await?;
        info!(product_id = %product_id, history_records = removed, "product deleted");
        Ok(())
    }

    // -- queries & maintenance --------------------------------------------

    pub async fn get(&self, product_id: Uuid) -> StockroomResult<Product> {
        self.products.get_by_id(product_id).await
    }

    pub async fn list(&self, filter: ProductFilter) -> StockroomResult<Vec<Product>> {
        self.products.list(filter).await
    }

    /// Full assignment history, most recent first.
    pub async fn history(&self, product_id: Uuid) -> StockroomResult<Vec<Assignment>> {
        // Surface a 404 for unknown ids rather than an empty list.
        self.products.get_by_id(product_id).await?;
        self.assignments.list_by_product(product_id).await
    }

    pub async fn stock_summary(&self) -> StockroomResult<Vec<StockSummary>> {
        self.products.stock_summary().await
    }

    /// Edit mutable fields. Model and guide references are validated,
    /// and a model change re-denormalizes name/part number/description.
    pub async fn update(&self, product_id: Uuid, mut input: UpdateProduct) -> StockroomResult<Product> {
        let product = self.products.get_by_id(product_id).await?;

        if let Some(guide_id) = input.dispatch_guide_id {
            // Products must stay attached to an existing guide.
            self.guides.get_by_id(guide_id).await?;
        }

        if let Some(model_id) = input.product_model_id {
            let model = self.models.get_by_id(model_id).await?;
            input.name = Some(model.name);
            input.part_number = Some(model.part_number);
            input.description = Some(model.description);
        }

        if let Some(serial) = &input.serial_number {
            let serial = serial.trim();
            if serial.is_empty() {
                return Err(StockroomError::validation("serial number cannot be empty"));
            }
            if let Some(existing) = self.products.find_by_serial(serial).await? {
                if existing.id != product.id {
                    return Err(StockroomError::conflict(format!(
                        "a product with serial number {serial} already exists"
                    )));
                }
            }
            input.serial_number = Some(serial.to_string());
        }

        self.products.update_fields(product_id, input).await
    }

    /// Repair operation: recompute the snapshot and status from the
    /// latest history record and write them back. DECOMMISSIONED
    /// products are left untouched (the terminal state wins).
    pub async fn rebuild_snapshot(&self, product_id: Uuid) -> StockroomResult<Product> {
        let product = self.products.get_by_id(product_id).await?;
        if product.status == ProductStatus::Decommissioned {
            return Ok(product);
        }

        let latest = self.assignments.latest_for_product(product_id).await?;
        let (status, snapshot) = match latest {
            Some(record) if record.action == AssignmentAction::Assign => (
                ProductStatus::Assigned,
                Some(AssignmentSnapshot {
                    assigned_to: record.assigned_to,
                    assigned_email: record.assigned_email,
                    assigned_ad_account: record.assigned_ad_account,
                    location: record.location,
                    assignment_date: record.assignment_date,
                }),
            ),
            _ => (ProductStatus::Available, None),
        };

        self.products
            .restore_snapshot(product_id, status, snapshot)
            .await
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Trim and reject empty/whitespace-only required fields.
fn require_trimmed(value: &str, message: &str) -> StockroomResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StockroomError::validation(message));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field; whitespace-only collapses to `None`.
fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trim serials and drop empties, preserving order.
fn sanitize_serials(serials: &[String]) -> Vec<String> {
    serials
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Values appearing more than once, deduplicated, in first-seen order.
fn duplicated_serials(serials: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicated = Vec::new();
    for serial in serials {
        if !seen.insert(serial.as_str()) && !duplicated.contains(serial) {
            duplicated.push(serial.clone());
        }
    }
    duplicated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicated_serials_reports_each_value_once() {
        let serials = vec![
            "A1".to_string(),
            "A2".to_string(),
            "A1".to_string(),
            "A1".to_string(),
        ];
        assert_eq!(duplicated_serials(&serials), vec!["A1".to_string()]);
    }

    #[test]
    fn duplicated_serials_empty_for_unique_input() {
        let serials = vec!["A1".to_string(), "A2".to_string()];
        assert!(duplicated_serials(&serials).is_empty());
    }

    #[test]
    fn sanitize_drops_blank_entries() {
        let serials = vec![
            "  SN-1 ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "SN-2".to_string(),
        ];
        assert_eq!(
            sanitize_serials(&serials),
            vec!["SN-1".to_string(), "SN-2".to_string()]
        );
    }

    #[test]
    fn require_trimmed_rejects_whitespace() {
        assert!(require_trimmed("   ", "required").is_err());
        assert_eq!(require_trimmed(" ok ", "required").unwrap(), "ok");
    }

    #[test]
    fn normalize_optional_collapses_blank_to_none() {
        assert_eq!(normalize_optional(&Some("  ".into())), None);
        assert_eq!(normalize_optional(&None), None);
        assert_eq!(
            normalize_optional(&Some(" x ".into())),
            Some("x".to_string())
        );
    }
}
