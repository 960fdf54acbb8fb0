//! SurrealDB implementation of [`ExternalActRepository`].

use chrono::{DateTime, Utc};
use stockroom_core::error::StockroomResult;
use stockroom_core::models::external_act::{
    CreateExternalDecommissionAct, ExternalDecommissionAct,
};
use stockroom_core::repository::ExternalActRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

#[derive(Debug, SurrealValue)]
struct ActRow {
    inventory_manager: String,
    product_name: String,
    serial_number: Option<String>,
    operational_unit: String,
    record_date: DateTime<Utc>,
    file_name: String,
    stored_file_name: String,
    file_size: Option<u64>,
    mime_type: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActRow {
    fn into_act(self, id: Uuid) -> Result<ExternalDecommissionAct, DbError> {
        Ok(ExternalDecommissionAct {
            id,
            inventory_manager: self.inventory_manager,
            product_name: self.product_name,
            serial_number: self.serial_number,
            operational_unit: self.operational_unit,
            record_date: self.record_date,
            file_name: self.file_name,
            stored_file_name: self.stored_file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            uploaded_by: parse_uuid(&self.uploaded_by, "user")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ActRowWithId {
    record_id: String,
    inventory_manager: String,
    product_name: String,
    serial_number: Option<String>,
    operational_unit: String,
    record_date: DateTime<Utc>,
    file_name: String,
    stored_file_name: String,
    file_size: Option<u64>,
    mime_type: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActRowWithId {
    fn try_into_act(self) -> Result<ExternalDecommissionAct, DbError> {
        let id = parse_uuid(&self.record_id, "external decommission act")?;
        ActRow {
            inventory_manager: self.inventory_manager,
            product_name: self.product_name,
            serial_number: self.serial_number,
            operational_unit: self.operational_unit,
            record_date: self.record_date,
            file_name: self.file_name,
            stored_file_name: self.stored_file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_act(id)
    }
}

/// SurrealDB implementation of the external-act repository.
#[derive(Clone)]
pub struct SurrealExternalActRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealExternalActRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ExternalActRepository for SurrealExternalActRepository<C> {
    async fn create(
        &self,
        input: CreateExternalDecommissionAct,
    ) -> StockroomResult<ExternalDecommissionAct> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('external_decommission_act', $id) SET \
                 inventory_manager = $inventory_manager, \
                 product_name = $product_name, \
                 serial_number = $serial_number, \
                 operational_unit = $operational_unit, \
                 record_date = $record_date, \
                 file_name = $file_name, \
                 stored_file_name = $stored_file_name, \
                 file_size = $file_size, \
                 mime_type = $mime_type, \
                 uploaded_by = $uploaded_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("inventory_manager", input.inventory_manager))
            .bind(("product_name", input.product_name))
            .bind(("serial_number", input.serial_number))
            .bind(("operational_unit", input.operational_unit))
            .bind(("record_date", input.record_date))
            .bind(("file_name", input.file_name))
            .bind(("stored_file_name", input.stored_file_name))
            .bind(("file_size", input.file_size))
            .bind(("mime_type", input.mime_type))
            .bind(("uploaded_by", input.uploaded_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ActRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "external decommission act".into(),
            id: id_str,
        })?;
        Ok(row.into_act(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> StockroomResult<ExternalDecommissionAct> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('external_decommission_act', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "external decommission act".into(),
            id: id_str,
        })?;
        Ok(row.into_act(id)?)
    }

    async fn list(&self) -> StockroomResult<Vec<ExternalDecommissionAct>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM external_decommission_act \
                 ORDER BY record_date DESC, created_at DESC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActRowWithId> = result.take(0).map_err(DbError::from)?;
        let acts = rows
            .into_iter()
            .map(ActRowWithId::try_into_act)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(acts)
    }
}
