//! SurrealDB implementation of [`ProductModelRepository`].

use chrono::{DateTime, Utc};
use stockroom_core::error::{StockroomError, StockroomResult};
use stockroom_core::models::product_model::{CreateProductModel, ProductModel};
use stockroom_core::repository::ProductModelRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

#[derive(Debug, SurrealValue)]
struct ModelRow {
    name: String,
    description: Option<String>,
    part_number: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ModelRow {
    fn into_model(self, id: Uuid) -> Result<ProductModel, DbError> {
        Ok(ProductModel {
            id,
            name: self.name,
            description: self.description,
            part_number: self.part_number,
            created_by: self
                .created_by
                .map(|v| parse_uuid(&v, "user"))
                .transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ModelRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    part_number: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ModelRowWithId {
    fn try_into_model(self) -> Result<ProductModel, DbError> {
        let id = parse_uuid(&self.record_id, "product model")?;
        ModelRow {
            name: self.name,
            description: self.description,
            part_number: self.part_number,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_model(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the ProductModel repository.
#[derive(Clone)]
pub struct SurrealProductModelRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductModelRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProductModelRepository for SurrealProductModelRepository<C> {
    async fn create(&self, input: CreateProductModel) -> StockroomResult<ProductModel> {
        // Part numbers identify catalog entries on their own; reject a
        // duplicate before touching the (name, part_number) index.
        if self.get_by_part_number(&input.part_number).await?.is_some() {
            return Err(StockroomError::conflict(format!(
                "a product model with part number {} already exists",
                input.part_number
            )));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('product_model', $id) SET \
                 name = $name, \
                 description = $description, \
                 part_number = $part_number, \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("part_number", input.part_number))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| {
            crate::error::map_unique_violation(
                e,
                "a product model with this name and part number already exists",
            )
        })?;

        let rows: Vec<ModelRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product model".into(),
            id: id_str,
        })?;
        Ok(row.into_model(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> StockroomResult<ProductModel> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('product_model', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModelRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "product model".into(),
            id: id_str,
        })?;
        Ok(row.into_model(id)?)
    }

    async fn get_by_part_number(&self, part_number: &str) -> StockroomResult<Option<ProductModel>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM product_model \
                 WHERE part_number = $part_number",
            )
            .bind(("part_number", part_number.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModelRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_model()?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> StockroomResult<Vec<ProductModel>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM product_model \
                 ORDER BY name ASC, part_number ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ModelRowWithId> = result.take(0).map_err(DbError::from)?;
        let models = rows
            .into_iter()
            .map(ModelRowWithId::try_into_model)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(models)
    }

    async fn delete(&self, id: Uuid) -> StockroomResult<()> {
        let id_str = id.to_string();

        // Referential guard: products must not reference the model.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM product \
                 WHERE product_model_id = $model_id GROUP ALL",
            )
            .bind(("model_id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let referencing = rows.first().map(|r| r.total).unwrap_or(0);
        if referencing > 0 {
            return Err(StockroomError::precondition(
                "product model is referenced by registered products and cannot be deleted",
            ));
        }

        self.db
            .query("DELETE type::record('product_model', $id)")
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
