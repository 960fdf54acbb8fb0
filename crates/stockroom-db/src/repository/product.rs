//! SurrealDB implementation of [`ProductRepository`].
//!
//! Lifecycle transitions are conditional updates: the `WHERE` clause
//! re-checks the status guard, so a racing transition that lost the
//! read-modify-write window matches zero rows and the caller observes
//! `None`.
//!
//! Serial-number uniqueness is sparse (products without a serial are
//! unconstrained), which a SurrealDB unique index cannot express —
//! `create`/`create_many` run a pre-insert lookup instead.

use chrono::{DateTime, Utc};
use stockroom_core::error::StockroomResult;
use stockroom_core::models::product::{
    AssignmentSnapshot, CreateProduct, Product, ProductFilter, ProductStatus, ProductType,
    StockSummary, StockTotals, TypeBreakdown, UpdateProduct,
};
use stockroom_core::repository::ProductRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_status(s: &str) -> Result<ProductStatus, DbError> {
    match s {
        "AVAILABLE" => Ok(ProductStatus::Available),
        "ASSIGNED" => Ok(ProductStatus::Assigned),
        "DECOMMISSIONED" => Ok(ProductStatus::Decommissioned),
        other => Err(DbError::Decode(format!("unknown product status: {other}"))),
    }
}

fn status_to_string(s: ProductStatus) -> &'static str {
    match s {
        ProductStatus::Available => "AVAILABLE",
        ProductStatus::Assigned => "ASSIGNED",
        ProductStatus::Decommissioned => "DECOMMISSIONED",
    }
}

fn parse_type(s: &str) -> Result<ProductType, DbError> {
    match s {
        "PURCHASED" => Ok(ProductType::Purchased),
        "RENTAL" => Ok(ProductType::Rental),
        other => Err(DbError::Decode(format!("unknown product type: {other}"))),
    }
}

fn type_to_string(t: ProductType) -> &'static str {
    match t {
        ProductType::Purchased => "PURCHASED",
        ProductType::Rental => "RENTAL",
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

fn parse_opt_uuid(s: Option<String>, what: &str) -> Result<Option<Uuid>, DbError> {
    s.map(|v| parse_uuid(&v, what)).transpose()
}

/// Nested snapshot object as stored on the product row.
#[derive(Debug, SurrealValue)]
struct SnapshotRow {
    assigned_to: String,
    assigned_email: Option<String>,
    assigned_ad_account: Option<String>,
    location: String,
    assignment_date: DateTime<Utc>,
}

impl SnapshotRow {
    fn into_snapshot(self) -> AssignmentSnapshot {
        AssignmentSnapshot {
            assigned_to: self.assigned_to,
            assigned_email: self.assigned_email,
            assigned_ad_account: self.assigned_ad_account,
            location: self.location,
            assignment_date: self.assignment_date,
        }
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ProductRow {
    product_model_id: String,
    name: String,
    description: Option<String>,
    product_type: String,
    is_serialized: bool,
    serial_number: Option<String>,
    quantity: u32,
    part_number: String,
    inventory_number: Option<String>,
    rental_id: Option<String>,
    dispatch_guide_id: String,
    status: String,
    current_assignment: Option<SnapshotRow>,
    decommission_reason: Option<String>,
    decommissioned_at: Option<DateTime<Utc>>,
    decommissioned_by: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, id: Uuid) -> Result<Product, DbError> {
        Ok(Product {
            id,
            product_model_id: parse_uuid(&self.product_model_id, "product model")?,
            name: self.name,
            description: self.description,
            product_type: parse_type(&self.product_type)?,
            is_serialized: self.is_serialized,
            serial_number: self.serial_number,
            quantity: self.quantity,
            part_number: self.part_number,
            inventory_number: self.inventory_number,
            rental_id: self.rental_id,
            dispatch_guide_id: parse_uuid(&self.dispatch_guide_id, "dispatch guide")?,
            status: parse_status(&self.status)?,
            current_assignment: self.current_assignment.map(SnapshotRow::into_snapshot),
            decommission_reason: self.decommission_reason,
            decommissioned_at: self.decommissioned_at,
            decommissioned_by: parse_opt_uuid(self.decommissioned_by, "user")?,
            created_by: parse_opt_uuid(self.created_by, "user")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProductRowWithId {
    record_id: String,
    product_model_id: String,
    name: String,
    description: Option<String>,
    product_type: String,
    is_serialized: bool,
    serial_number: Option<String>,
    quantity: u32,
    part_number: String,
    inventory_number: Option<String>,
    rental_id: Option<String>,
    dispatch_guide_id: String,
    status: String,
    current_assignment: Option<SnapshotRow>,
    decommission_reason: Option<String>,
    decommissioned_at: Option<DateTime<Utc>>,
    decommissioned_by: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRowWithId {
    fn try_into_product(self) -> Result<Product, DbError> {
        let id = parse_uuid(&self.record_id, "product")?;
        let row = ProductRow {
            product_model_id: self.product_model_id,
            name: self.name,
            description: self.description,
            product_type: self.product_type,
            is_serialized: self.is_serialized,
            serial_number: self.serial_number,
            quantity: self.quantity,
            part_number: self.part_number,
            inventory_number: self.inventory_number,
            rental_id: self.rental_id,
            dispatch_guide_id: self.dispatch_guide_id,
            status: self.status,
            current_assignment: self.current_assignment,
            decommission_reason: self.decommission_reason,
            decommissioned_at: self.decommissioned_at,
            decommissioned_by: self.decommissioned_by,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_product(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct SerialRow {
    serial_number: String,
}

/// Minimal row for the stock aggregation.
#[derive(Debug, SurrealValue)]
struct SummaryRow {
    product_model_id: String,
    name: String,
    part_number: String,
    description: Option<String>,
    product_type: String,
    status: String,
    quantity: u32,
}

/// SurrealDB implementation of the Product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Product, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('product', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<ProductRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;
        row.into_product(id)
    }

    async fn serial_in_use(&self, serial: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT serial_number FROM product WHERE serial_number = $serial")
            .bind(("serial", serial.to_string()))
            .await?;
        let rows: Vec<SerialRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn insert(&self, input: CreateProduct) -> Result<Product, DbError> {
        if let Some(serial) = &input.serial_number {
            if self.serial_in_use(serial).await? {
                return Err(DbError::Conflict(format!(
                    "a product with serial number {serial} already exists"
                )));
            }
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('product', $id) SET \
                 product_model_id = $product_model_id, \
                 name = $name, description = $description, \
                 product_type = $product_type, \
                 is_serialized = $is_serialized, \
                 serial_number = $serial_number, \
                 quantity = $quantity, \
                 part_number = $part_number, \
                 inventory_number = $inventory_number, \
                 rental_id = $rental_id, \
                 dispatch_guide_id = $dispatch_guide_id, \
                 status = 'AVAILABLE', \
                 current_assignment = NONE, \
                 decommission_reason = NONE, \
                 decommissioned_at = NONE, \
                 decommissioned_by = NONE, \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("product_model_id", input.product_model_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("product_type", type_to_string(input.product_type).to_string()))
            .bind(("is_serialized", input.is_serialized))
            .bind(("serial_number", input.serial_number))
            .bind(("quantity", input.quantity))
            .bind(("part_number", input.part_number))
            .bind(("inventory_number", input.inventory_number))
            .bind(("rental_id", input.rental_id))
            .bind(("dispatch_guide_id", input.dispatch_guide_id.to_string()))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .await?;

        let mut result = result
            .check()
            .map_err(|e| crate::error::map_unique_violation(e, "duplicate serial number"))?;

        let rows: Vec<ProductRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;
        row.into_product(id)
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(&self, input: CreateProduct) -> StockroomResult<Product> {
        Ok(self.insert(input).await?)
    }

    async fn create_many(&self, inputs: Vec<CreateProduct>) -> StockroomResult<Vec<Product>> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(self.insert(input).await?);
        }
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> StockroomResult<Product> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn find_by_serial(&self, serial: &str) -> StockroomResult<Option<Product>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM product \
                 WHERE serial_number = $serial",
            )
            .bind(("serial", serial.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_product()?)),
            None => Ok(None),
        }
    }

    async fn existing_serials(&self, serials: &[String]) -> StockroomResult<Vec<String>> {
        let mut result = self
            .db
            .query(
                "SELECT serial_number FROM product \
                 WHERE serial_number IN $serials",
            )
            .bind(("serials", serials.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SerialRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| r.serial_number).collect())
    }

    async fn list(&self, filter: ProductFilter) -> StockroomResult<Vec<Product>> {
        let mut conditions: Vec<&'static str> = Vec::new();
        if filter.product_type.is_some() {
            conditions.push("product_type = $product_type");
        }
        match filter.statuses.len() {
            0 => {}
            1 => conditions.push("status = $status"),
            _ => conditions.push("status IN $statuses"),
        }
        if filter.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(name), $search) \
                 OR string::contains(string::lowercase(part_number), $search) \
                 OR (serial_number != NONE \
                     AND string::contains(string::lowercase(serial_number), $search)) \
                 OR (inventory_number != NONE \
                     AND string::contains(string::lowercase(inventory_number), $search)) \
                 OR (rental_id != NONE \
                     AND string::contains(string::lowercase(rental_id), $search)))",
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM product{where_clause} \
             ORDER BY created_at DESC"
        );

        let mut builder = self.db.query(&query);
        if let Some(product_type) = filter.product_type {
            builder = builder.bind(("product_type", type_to_string(product_type).to_string()));
        }
        match filter.statuses.len() {
            0 => {}
            1 => {
                builder = builder.bind(("status", status_to_string(filter.statuses[0]).to_string()));
            }
            _ => {
                let statuses: Vec<String> = filter
                    .statuses
                    .iter()
                    .map(|s| status_to_string(*s).to_string())
                    .collect();
                builder = builder.bind(("statuses", statuses));
            }
        }
        if let Some(search) = filter.search {
            builder = builder.bind(("search", search.to_lowercase()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ProductRowWithId> = result.take(0).map_err(DbError::from)?;
        let products = rows
            .into_iter()
            .map(ProductRowWithId::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(products)
    }

    async fn update_fields(&self, id: Uuid, input: UpdateProduct) -> StockroomResult<Product> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.serial_number.is_some() {
            sets.push("serial_number = $serial_number");
        }
        if input.inventory_number.is_some() {
            sets.push("inventory_number = $inventory_number");
        }
        if input.rental_id.is_some() {
            sets.push("rental_id = $rental_id");
        }
        if input.dispatch_guide_id.is_some() {
            sets.push("dispatch_guide_id = $dispatch_guide_id");
        }
        if input.product_model_id.is_some() {
            sets.push("product_model_id = $product_model_id");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.part_number.is_some() {
            sets.push("part_number = $part_number");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('product', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(description) = input.description {
            // Option<Option<String>>: Some(None) clears the field.
            builder = builder.bind(("description", description));
        }
        if let Some(serial_number) = input.serial_number {
            builder = builder.bind(("serial_number", serial_number));
        }
        if let Some(inventory_number) = input.inventory_number {
            builder = builder.bind(("inventory_number", inventory_number));
        }
        if let Some(rental_id) = input.rental_id {
            builder = builder.bind(("rental_id", rental_id));
        }
        if let Some(guide_id) = input.dispatch_guide_id {
            builder = builder.bind(("dispatch_guide_id", guide_id.to_string()));
        }
        if let Some(model_id) = input.product_model_id {
            builder = builder.bind(("product_model_id", model_id.to_string()));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(part_number) = input.part_number {
            builder = builder.bind(("part_number", part_number));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| crate::error::map_unique_violation(e, "duplicate serial number"))?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;
        Ok(row.into_product(id)?)
    }

    async fn mark_assigned(
        &self,
        id: Uuid,
        snapshot: AssignmentSnapshot,
    ) -> StockroomResult<Option<Product>> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 status = 'ASSIGNED', \
                 current_assignment = { \
                     assigned_to: $assigned_to, \
                     assigned_email: $assigned_email, \
                     assigned_ad_account: $assigned_ad_account, \
                     location: $location, \
                     assignment_date: $assignment_date \
                 }, \
                 decommission_reason = NONE, \
                 decommissioned_at = NONE, \
                 decommissioned_by = NONE, \
                 updated_at = time::now() \
                 WHERE status = 'AVAILABLE' AND current_assignment = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("assigned_to", snapshot.assigned_to))
            .bind(("assigned_email", snapshot.assigned_email))
            .bind(("assigned_ad_account", snapshot.assigned_ad_account))
            .bind(("location", snapshot.location))
            .bind(("assignment_date", snapshot.assignment_date))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_product(id)?)),
            None => Ok(None),
        }
    }

    async fn mark_available(&self, id: Uuid) -> StockroomResult<Option<Product>> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 status = 'AVAILABLE', \
                 current_assignment = NONE, \
                 updated_at = time::now() \
                 WHERE status != 'DECOMMISSIONED' \
                 AND current_assignment != NONE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_product(id)?)),
            None => Ok(None),
        }
    }

    async fn mark_decommissioned(
        &self,
        id: Uuid,
        reason: String,
        decommissioned_at: DateTime<Utc>,
        decommissioned_by: Uuid,
    ) -> StockroomResult<Option<Product>> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 status = 'DECOMMISSIONED', \
                 current_assignment = NONE, \
                 decommission_reason = $reason, \
                 decommissioned_at = $decommissioned_at, \
                 decommissioned_by = $decommissioned_by, \
                 updated_at = time::now() \
                 WHERE status = 'AVAILABLE'",
            )
            .bind(("id", id.to_string()))
            .bind(("reason", reason))
            .bind(("decommissioned_at", decommissioned_at))
            .bind(("decommissioned_by", decommissioned_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_product(id)?)),
            None => Ok(None),
        }
    }

    async fn restore_snapshot(
        &self,
        id: Uuid,
        status: ProductStatus,
        snapshot: Option<AssignmentSnapshot>,
    ) -> StockroomResult<Product> {
        let id_str = id.to_string();

        let mut result = match snapshot {
            Some(snapshot) => self
                .db
                .query(
                    "UPDATE type::record('product', $id) SET \
                     status = $status, \
                     current_assignment = { \
                         assigned_to: $assigned_to, \
                         assigned_email: $assigned_email, \
                         assigned_ad_account: $assigned_ad_account, \
                         location: $location, \
                         assignment_date: $assignment_date \
                     }, \
                     updated_at = time::now()",
                )
                .bind(("id", id_str.clone()))
                .bind(("status", status_to_string(status).to_string()))
                .bind(("assigned_to", snapshot.assigned_to))
                .bind(("assigned_email", snapshot.assigned_email))
                .bind(("assigned_ad_account", snapshot.assigned_ad_account))
                .bind(("location", snapshot.location))
                .bind(("assignment_date", snapshot.assignment_date))
                .await
                .map_err(DbError::from)?,
            None => self
                .db
                .query(
                    "UPDATE type::record('product', $id) SET \
                     status = $status, \
                     current_assignment = NONE, \
                     updated_at = time::now()",
                )
                .bind(("id", id_str.clone()))
                .bind(("status", status_to_string(status).to_string()))
                .await
                .map_err(DbError::from)?,
        };

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product".into(),
            id: id_str,
        })?;
        Ok(row.into_product(id)?)
    }

    async fn count_by_dispatch_guide(&self, guide_id: Uuid) -> StockroomResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM product \
                 WHERE dispatch_guide_id = $guide_id GROUP ALL",
            )
            .bind(("guide_id", guide_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn count_by_model(&self, model_id: Uuid) -> StockroomResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM product \
                 WHERE product_model_id = $model_id GROUP ALL",
            )
            .bind(("model_id", model_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn delete(&self, id: Uuid) -> StockroomResult<()> {
        self.db
            .query("DELETE type::record('product', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn stock_summary(&self) -> StockroomResult<Vec<StockSummary>> {
        let mut result = self
            .db
            .query(
                "SELECT product_model_id, name, part_number, description, \
                 product_type, status, quantity FROM product",
            )
            .await
            .map_err(DbError::from)?;
        let rows: Vec<SummaryRow> = result.take(0).map_err(DbError::from)?;

        // Aggregate in-process, keyed by (name, part number, model id)
        // so the result comes out sorted by name then part number.
        let mut grouped: std::collections::BTreeMap<(String, String, String), StockSummary> =
            std::collections::BTreeMap::new();

        for row in rows {
            let model_id = parse_uuid(&row.product_model_id, "product model")?;
            let units = u64::from(row.quantity.max(1));
            let key = (
                row.name.clone(),
                row.part_number.clone(),
                row.product_model_id.clone(),
            );
            let entry = grouped.entry(key).or_insert_with(|| StockSummary {
                product_model_id: model_id,
                name: row.name.clone(),
                part_number: row.part_number.clone(),
                description: row.description.clone(),
                totals: StockTotals::default(),
                type_breakdown: TypeBreakdown::default(),
            });

            entry.totals.total += units;
            match row.status.as_str() {
                "AVAILABLE" => entry.totals.available += units,
                "ASSIGNED" => entry.totals.assigned += units,
                "DECOMMISSIONED" => entry.totals.decommissioned += units,
                _ => {}
            }
            match row.product_type.as_str() {
                "PURCHASED" => entry.type_breakdown.purchased += units,
                "RENTAL" => entry.type_breakdown.rental += units,
                _ => {}
            }
        }

        Ok(grouped.into_values().collect())
    }
}
