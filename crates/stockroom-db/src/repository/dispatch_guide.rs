//! SurrealDB implementation of [`DispatchGuideRepository`].
//!
//! Deletion carries the referential guard: a guide cannot be removed
//! while any product still references it.

use chrono::{DateTime, Utc};
use stockroom_core::error::{StockroomError, StockroomResult};
use stockroom_core::models::dispatch_guide::{CreateDispatchGuide, DispatchGuide};
use stockroom_core::repository::DispatchGuideRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

#[derive(Debug, SurrealValue)]
struct GuideRow {
    guide_number: String,
    vendor: String,
    dispatch_date: DateTime<Utc>,
    file_name: String,
    stored_file_name: String,
    file_size: Option<u64>,
    mime_type: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GuideRow {
    fn into_guide(self, id: Uuid) -> Result<DispatchGuide, DbError> {
        Ok(DispatchGuide {
            id,
            guide_number: self.guide_number,
            vendor: self.vendor,
            dispatch_date: self.dispatch_date,
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
struct GuideRowWithId {
    record_id: String,
    guide_number: String,
    vendor: String,
    dispatch_date: DateTime<Utc>,
    file_name: String,
    stored_file_name: String,
    file_size: Option<u64>,
    mime_type: Option<String>,
    uploaded_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GuideRowWithId {
    fn try_into_guide(self) -> Result<DispatchGuide, DbError> {
        let id = parse_uuid(&self.record_id, "dispatch guide")?;
        GuideRow {
            guide_number: self.guide_number,
            vendor: self.vendor,
            dispatch_date: self.dispatch_date,
            file_name: self.file_name,
            stored_file_name: self.stored_file_name,
            file_size: self.file_size,
            mime_type: self.mime_type,
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_guide(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the DispatchGuide repository.
#[derive(Clone)]
pub struct SurrealDispatchGuideRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDispatchGuideRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DispatchGuideRepository for SurrealDispatchGuideRepository<C> {
    async fn create(&self, input: CreateDispatchGuide) -> StockroomResult<DispatchGuide> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('dispatch_guide', $id) SET \
                 guide_number = $guide_number, \
                 vendor = $vendor, \
                 dispatch_date = $dispatch_date, \
                 file_name = $file_name, \
                 stored_file_name = $stored_file_name, \
                 file_size = $file_size, \
                 mime_type = $mime_type, \
                 uploaded_by = $uploaded_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("guide_number", input.guide_number.clone()))
            .bind(("vendor", input.vendor))
            .bind(("dispatch_date", input.dispatch_date))
            .bind(("file_name", input.file_name))
            .bind(("stored_file_name", input.stored_file_name))
            .bind(("file_size", input.file_size))
            .bind(("mime_type", input.mime_type))
            .bind(("uploaded_by", input.uploaded_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            crate::error::map_unique_violation(
                e,
                &format!(
                    "a dispatch guide with number {} already exists",
                    input.guide_number
                ),
            )
        })?;

        let rows: Vec<GuideRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "dispatch guide".into(),
            id: id_str,
        })?;
        Ok(row.into_guide(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> StockroomResult<DispatchGuide> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('dispatch_guide', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GuideRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "dispatch guide".into(),
            id: id_str,
        })?;
        Ok(row.into_guide(id)?)
    }

    async fn get_by_number(&self, guide_number: &str) -> StockroomResult<Option<DispatchGuide>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM dispatch_guide \
                 WHERE guide_number = $guide_number",
            )
            .bind(("guide_number", guide_number.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GuideRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_guide()?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StockroomResult<Vec<DispatchGuide>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM dispatch_guide \
                 ORDER BY created_at DESC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GuideRowWithId> = result.take(0).map_err(DbError::from)?;
        let guides = rows
            .into_iter()
            .map(GuideRowWithId::try_into_guide)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(guides)
    }

    async fn delete(&self, id: Uuid) -> StockroomResult<()> {
        let id_str = id.to_string();

        // Referential guard: products must not reference the guide.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM product \
                 WHERE dispatch_guide_id = $guide_id GROUP ALL",
            )
            .bind(("guide_id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let referencing = rows.first().map(|r| r.total).unwrap_or(0);
        if referencing > 0 {
            return Err(StockroomError::precondition(
                "dispatch guide is referenced by registered products and cannot be deleted",
            ));
        }

        self.db
            .query("DELETE type::record('dispatch_guide', $id)")
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
