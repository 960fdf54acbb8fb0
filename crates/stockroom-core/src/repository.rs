//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lifecycle transitions go
//! through *guarded* updates (compare-and-swap on `status`) so that
//! racing transitions against the same product are serialized at the
//! store layer: the update only applies when the guard still matches,
//! and the caller observes `None` when it lost the race.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StockroomResult;
use crate::models::{
    assignment::{Assignment, CreateAssignment},
    dispatch_guide::{CreateDispatchGuide, DispatchGuide},
    external_act::{CreateExternalDecommissionAct, ExternalDecommissionAct},
    product::{
        AssignmentSnapshot, CreateProduct, Product, ProductFilter, ProductStatus, StockSummary,
        UpdateProduct,
    },
    product_model::{CreateProductModel, ProductModel},
    user::{CreateUser, UpdateUser, User, UserRole},
};

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub trait ProductRepository: Send + Sync {
    /// Insert a new AVAILABLE product. Duplicate non-empty serial
    /// numbers fail with `Conflict` (sparse uniqueness: any number of
    /// products may carry no serial number).
    fn create(&self, input: CreateProduct) -> impl Future<Output = StockroomResult<Product>> + Send;

    /// Insert a batch of products. Callers are expected to have
    /// validated the batch beforehand (see the lifecycle service);
    /// serial collisions still fail with `Conflict`.
    fn create_many(
        &self,
        inputs: Vec<CreateProduct>,
    ) -> impl Future<Output = StockroomResult<Vec<Product>>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StockroomResult<Product>> + Send;

    fn find_by_serial(
        &self,
        serial: &str,
    ) -> impl Future<Output = StockroomResult<Option<Product>>> + Send;

    /// Of the given serials, return those already present in the store.
    fn existing_serials(
        &self,
        serials: &[String],
    ) -> impl Future<Output = StockroomResult<Vec<String>>> + Send;

    /// List newest-first, optionally filtered.
    fn list(
        &self,
        filter: ProductFilter,
    ) -> impl Future<Output = StockroomResult<Vec<Product>>> + Send;

    fn update_fields(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> impl Future<Output = StockroomResult<Product>> + Send;

    /// Guarded transition AVAILABLE -> ASSIGNED. Applies only while
    /// `status = AVAILABLE` and no snapshot is set; returns `None`
    /// when the guard no longer matches.
    fn mark_assigned(
        &self,
        id: Uuid,
        snapshot: AssignmentSnapshot,
    ) -> impl Future<Output = StockroomResult<Option<Product>>> + Send;

    /// Guarded transition back to AVAILABLE. Applies only while a
    /// snapshot is set and the product is not DECOMMISSIONED.
    fn mark_available(&self, id: Uuid)
    -> impl Future<Output = StockroomResult<Option<Product>>> + Send;

    /// Guarded transition AVAILABLE -> DECOMMISSIONED (terminal).
    fn mark_decommissioned(
        &self,
        id: Uuid,
        reason: String,
        decommissioned_at: DateTime<Utc>,
        decommissioned_by: Uuid,
    ) -> impl Future<Output = StockroomResult<Option<Product>>> + Send;

    /// Unconditional snapshot/status overwrite, used by the
    /// snapshot-rebuild repair operation.
    fn restore_snapshot(
        &self,
        id: Uuid,
        status: ProductStatus,
        snapshot: Option<AssignmentSnapshot>,
    ) -> impl Future<Output = StockroomResult<Product>> + Send;

    fn count_by_dispatch_guide(
        &self,
        guide_id: Uuid,
    ) -> impl Future<Output = StockroomResult<u64>> + Send;

    fn count_by_model(&self, model_id: Uuid) -> impl Future<Output = StockroomResult<u64>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = StockroomResult<()>> + Send;

    /// Aggregate counts per product model, sorted by name then part
    /// number.
    fn stock_summary(&self) -> impl Future<Output = StockroomResult<Vec<StockSummary>>> + Send;
}

// ---------------------------------------------------------------------------
// Assignment history (append-only)
// ---------------------------------------------------------------------------

pub trait AssignmentRepository: Send + Sync {
    /// Append a new history record. No update operation exists.
    fn append(
        &self,
        input: CreateAssignment,
    ) -> impl Future<Output = StockroomResult<Assignment>> + Send;

    /// All records for a product, most recent first (by effective
    /// date).
    fn list_by_product(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = StockroomResult<Vec<Assignment>>> + Send;

    fn latest_for_product(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = StockroomResult<Option<Assignment>>> + Send;

    /// Cascade helper used by product deletion; returns the number of
    /// removed records.
    fn delete_by_product(
        &self,
        product_id: Uuid,
    ) -> impl Future<Output = StockroomResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Dispatch guides
// ---------------------------------------------------------------------------

pub trait DispatchGuideRepository: Send + Sync {
    /// Duplicate guide numbers fail with `Conflict`.
    fn create(
        &self,
        input: CreateDispatchGuide,
    ) -> impl Future<Output = StockroomResult<DispatchGuide>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StockroomResult<DispatchGuide>> + Send;

    fn get_by_number(
        &self,
        guide_number: &str,
    ) -> impl Future<Output = StockroomResult<Option<DispatchGuide>>> + Send;

    fn list(&self) -> impl Future<Output = StockroomResult<Vec<DispatchGuide>>> + Send;

    /// Fails with `PreconditionFailed` while any product references
    /// the guide.
    fn delete(&self, id: Uuid) -> impl Future<Output = StockroomResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Product models (catalog)
// ---------------------------------------------------------------------------

pub trait ProductModelRepository: Send + Sync {
    /// Duplicate part numbers (and duplicate `(name, part_number)`
    /// pairs) fail with `Conflict`.
    fn create(
        &self,
        input: CreateProductModel,
    ) -> impl Future<Output = StockroomResult<ProductModel>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StockroomResult<ProductModel>> + Send;

    fn get_by_part_number(
        &self,
        part_number: &str,
    ) -> impl Future<Output = StockroomResult<Option<ProductModel>>> + Send;

    /// Sorted by name, then part number.
    fn list(&self) -> impl Future<Output = StockroomResult<Vec<ProductModel>>> + Send;

    /// Fails with `PreconditionFailed` while any product references
    /// the model.
    fn delete(&self, id: Uuid) -> impl Future<Output = StockroomResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Email is lowercased before storage; duplicates fail with
    /// `Conflict`.
    fn create(&self, input: CreateUser) -> impl Future<Output = StockroomResult<User>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StockroomResult<User>> + Send;

    fn get_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = StockroomResult<Option<User>>> + Send;

    fn list(&self) -> impl Future<Output = StockroomResult<Vec<User>>> + Send;

    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = StockroomResult<User>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = StockroomResult<()>> + Send;

    fn count(&self) -> impl Future<Output = StockroomResult<u64>> + Send;

    fn count_by_role(&self, role: UserRole) -> impl Future<Output = StockroomResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// External decommission acts (standalone, independent CRUD)
// ---------------------------------------------------------------------------

pub trait ExternalActRepository: Send + Sync {
    fn create(
        &self,
        input: CreateExternalDecommissionAct,
    ) -> impl Future<Output = StockroomResult<ExternalDecommissionAct>> + Send;

    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = StockroomResult<ExternalDecommissionAct>> + Send;

    /// Sorted by record date desc, then creation time desc.
    fn list(&self) -> impl Future<Output = StockroomResult<Vec<ExternalDecommissionAct>>> + Send;
}
