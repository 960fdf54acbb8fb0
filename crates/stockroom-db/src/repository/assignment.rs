//! SurrealDB implementation of [`AssignmentRepository`].
//!
//! The assignment table is append-only: records are created, listed,
//! and cascade-deleted with their product, never updated.

use chrono::{DateTime, Utc};
use stockroom_core::error::StockroomResult;
use stockroom_core::models::assignment::{Assignment, AssignmentAction, CreateAssignment};
use stockroom_core::repository::AssignmentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

fn parse_action(s: &str) -> Result<AssignmentAction, DbError> {
    match s {
        "ASSIGN" => Ok(AssignmentAction::Assign),
        "UNASSIGN" => Ok(AssignmentAction::Unassign),
        other => Err(DbError::Decode(format!("unknown assignment action: {other}"))),
    }
}

fn action_to_string(a: AssignmentAction) -> &'static str {
    match a {
        AssignmentAction::Assign => "ASSIGN",
        AssignmentAction::Unassign => "UNASSIGN",
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    product_id: String,
    action: String,
    assigned_to: String,
    assigned_email: Option<String>,
    assigned_ad_account: Option<String>,
    location: String,
    assignment_date: DateTime<Utc>,
    performed_by: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_assignment(self, id: Uuid) -> Result<Assignment, DbError> {
        Ok(Assignment {
            id,
            product_id: parse_uuid(&self.product_id, "product")?,
            action: parse_action(&self.action)?,
            assigned_to: self.assigned_to,
            assigned_email: self.assigned_email,
            assigned_ad_account: self.assigned_ad_account,
            location: self.location,
            assignment_date: self.assignment_date,
            performed_by: parse_uuid(&self.performed_by, "user")?,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    product_id: String,
    action: String,
    assigned_to: String,
    assigned_email: Option<String>,
    assigned_ad_account: Option<String>,
    location: String,
    assignment_date: DateTime<Utc>,
    performed_by: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<Assignment, DbError> {
        let id = parse_uuid(&self.record_id, "assignment")?;
        AssignmentRow {
            product_id: self.product_id,
            action: self.action,
            assigned_to: self.assigned_to,
            assigned_email: self.assigned_email,
            assigned_ad_account: self.assigned_ad_account,
            location: self.location,
            assignment_date: self.assignment_date,
            performed_by: self.performed_by,
            notes: self.notes,
            created_at: self.created_at,
        }
        .into_assignment(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Assignment repository.
#[derive(Clone)]
pub struct SurrealAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AssignmentRepository for SurrealAssignmentRepository<C> {
    async fn append(&self, input: CreateAssignment) -> StockroomResult<Assignment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('assignment', $id) SET \
                 product_id = $product_id, \
                 action = $action, \
                 assigned_to = $assigned_to, \
                 assigned_email = $assigned_email, \
                 assigned_ad_account = $assigned_ad_account, \
                 location = $location, \
                 assignment_date = $assignment_date, \
                 performed_by = $performed_by, \
                 notes = $notes",
            )
            .bind(("id", id_str.clone()))
            .bind(("product_id", input.product_id.to_string()))
            .bind(("action", action_to_string(input.action).to_string()))
            .bind(("assigned_to", input.assigned_to))
            .bind(("assigned_email", input.assigned_email))
            .bind(("assigned_ad_account", input.assigned_ad_account))
            .bind(("location", input.location))
            .bind(("assignment_date", input.assignment_date))
            .bind(("performed_by", input.performed_by.to_string()))
            .bind(("notes", input.notes))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "assignment".into(),
            id: id_str,
        })?;
        Ok(row.into_assignment(id)?)
    }

    async fn list_by_product(&self, product_id: Uuid) -> StockroomResult<Vec<Assignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM assignment \
                 WHERE product_id = $product_id \
                 ORDER BY assignment_date DESC, created_at DESC",
            )
            .bind(("product_id", product_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;
        let assignments = rows
            .into_iter()
            .map(AssignmentRowWithId::try_into_assignment)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(assignments)
    }

    async fn latest_for_product(&self, product_id: Uuid) -> StockroomResult<Option<Assignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM assignment \
                 WHERE product_id = $product_id \
                 ORDER BY assignment_date DESC, created_at DESC \
                 LIMIT 1",
            )
            .bind(("product_id", product_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_assignment()?)),
            None => Ok(None),
        }
    }

    async fn delete_by_product(&self, product_id: Uuid) -> StockroomResult<u64> {
        let product_id_str = product_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM assignment \
                 WHERE product_id = $product_id GROUP ALL",
            )
            .bind(("product_id", product_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE FROM assignment WHERE product_id = $product_id")
            .bind(("product_id", product_id_str))
            .await
            .map_err(DbError::from)?;

        Ok(total)
    }
}
