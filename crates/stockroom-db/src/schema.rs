//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.
//!
//! Serial-number uniqueness is *sparse* (any number of products may
//! carry no serial number), which SurrealDB's unique indexes cannot
//! express directly — the product repository enforces it with a
//! pre-insert lookup instead, and a plain index keeps the lookup fast.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['ADMIN', 'MANAGER', 'VIEWER'];
DEFINE FIELD ad_account ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Product models (catalog entries)
-- =======================================================================
DEFINE TABLE product_model SCHEMAFULL;
DEFINE FIELD name ON TABLE product_model TYPE string;
DEFINE FIELD description ON TABLE product_model TYPE option<string>;
DEFINE FIELD part_number ON TABLE product_model TYPE string;
DEFINE FIELD created_by ON TABLE product_model TYPE option<string>;
DEFINE FIELD created_at ON TABLE product_model TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE product_model TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_model_name_part ON TABLE product_model \
    COLUMNS name, part_number UNIQUE;

-- =======================================================================
-- Dispatch guides (delivery receipts)
-- =======================================================================
DEFINE TABLE dispatch_guide SCHEMAFULL;
DEFINE FIELD guide_number ON TABLE dispatch_guide TYPE string;
DEFINE FIELD vendor ON TABLE dispatch_guide TYPE string;
DEFINE FIELD dispatch_date ON TABLE dispatch_guide TYPE datetime;
DEFINE FIELD file_name ON TABLE dispatch_guide TYPE string;
DEFINE FIELD stored_file_name ON TABLE dispatch_guide TYPE string;
DEFINE FIELD file_size ON TABLE dispatch_guide TYPE option<int>;
DEFINE FIELD mime_type ON TABLE dispatch_guide TYPE option<string>;
DEFINE FIELD uploaded_by ON TABLE dispatch_guide TYPE string;
DEFINE FIELD created_at ON TABLE dispatch_guide TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE dispatch_guide TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_guide_number ON TABLE dispatch_guide \
    COLUMNS guide_number UNIQUE;

-- =======================================================================
-- Products (serialized units and quantity-tracked stock)
-- =======================================================================
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD product_model_id ON TABLE product TYPE string;
DEFINE FIELD name ON TABLE product TYPE string;
DEFINE FIELD description ON TABLE product TYPE option<string>;
DEFINE FIELD product_type ON TABLE product TYPE string \
    ASSERT $value IN ['PURCHASED', 'RENTAL'];
DEFINE FIELD is_serialized ON TABLE product TYPE bool DEFAULT true;
DEFINE FIELD serial_number ON TABLE product TYPE option<string>;
DEFINE FIELD quantity ON TABLE product TYPE int DEFAULT 1 \
    ASSERT $value >= 1;
DEFINE FIELD part_number ON TABLE product TYPE string;
DEFINE FIELD inventory_number ON TABLE product TYPE option<string>;
DEFINE FIELD rental_id ON TABLE product TYPE option<string>;
DEFINE FIELD dispatch_guide_id ON TABLE product TYPE string;
DEFINE FIELD status ON TABLE product TYPE string \
    ASSERT $value IN ['AVAILABLE', 'ASSIGNED', 'DECOMMISSIONED'];
DEFINE FIELD current_assignment ON TABLE product \
    TYPE option<object> FLEXIBLE;
DEFINE FIELD decommission_reason ON TABLE product TYPE option<string>;
DEFINE FIELD decommissioned_at ON TABLE product TYPE option<datetime>;
DEFINE FIELD decommissioned_by ON TABLE product TYPE option<string>;
DEFINE FIELD created_by ON TABLE product TYPE option<string>;
DEFINE FIELD created_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE product TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_product_serial ON TABLE product COLUMNS serial_number;
DEFINE INDEX idx_product_status ON TABLE product COLUMNS status;
DEFINE INDEX idx_product_guide ON TABLE product \
    COLUMNS dispatch_guide_id;
DEFINE INDEX idx_product_model ON TABLE product \
    COLUMNS product_model_id;

-- =======================================================================
-- Assignment history (append-only)
-- =======================================================================
DEFINE TABLE assignment SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete FULL;
DEFINE FIELD product_id ON TABLE assignment TYPE string;
DEFINE FIELD action ON TABLE assignment TYPE string \
    ASSERT $value IN ['ASSIGN', 'UNASSIGN'];
DEFINE FIELD assigned_to ON TABLE assignment TYPE string;
DEFINE FIELD assigned_email ON TABLE assignment TYPE option<string>;
DEFINE FIELD assigned_ad_account ON TABLE assignment \
    TYPE option<string>;
DEFINE FIELD location ON TABLE assignment TYPE string;
DEFINE FIELD assignment_date ON TABLE assignment TYPE datetime;
DEFINE FIELD performed_by ON TABLE assignment TYPE string;
DEFINE FIELD notes ON TABLE assignment TYPE option<string>;
DEFINE FIELD created_at ON TABLE assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_assignment_product_date ON TABLE assignment \
    COLUMNS product_id, assignment_date;

-- =======================================================================
-- External decommission acts (standalone audit documents)
-- =======================================================================
DEFINE TABLE external_decommission_act SCHEMAFULL;
DEFINE FIELD inventory_manager ON TABLE external_decommission_act \
    TYPE string;
DEFINE FIELD product_name ON TABLE external_decommission_act \
    TYPE string;
DEFINE FIELD serial_number ON TABLE external_decommission_act \
    TYPE option<string>;
DEFINE FIELD operational_unit ON TABLE external_decommission_act \
    TYPE string;
DEFINE FIELD record_date ON TABLE external_decommission_act \
    TYPE datetime;
DEFINE FIELD file_name ON TABLE external_decommission_act TYPE string;
DEFINE FIELD stored_file_name ON TABLE external_decommission_act \
    TYPE string;
DEFINE FIELD file_size ON TABLE external_decommission_act \
    TYPE option<int>;
DEFINE FIELD mime_type ON TABLE external_decommission_act \
    TYPE option<string>;
DEFINE FIELD uploaded_by ON TABLE external_decommission_act \
    TYPE string;
DEFINE FIELD created_at ON TABLE external_decommission_act \
    TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE external_decommission_act \
    TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_act_record_date ON TABLE external_decommission_act \
    COLUMNS record_date;
DEFINE INDEX idx_act_manager_product ON TABLE external_decommission_act \
    COLUMNS inventory_manager, product_name;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
