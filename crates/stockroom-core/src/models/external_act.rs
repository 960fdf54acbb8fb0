//! External decommission act — standalone audit document for assets
//! retired outside the system. No relation to the product tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDecommissionAct {
    pub id: Uuid,
    pub inventory_manager: String,
    pub product_name: String,
    pub serial_number: Option<String>,
    pub operational_unit: String,
    pub record_date: DateTime<Utc>,
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateExternalDecommissionAct {
    pub inventory_manager: String,
    pub product_name: String,
    pub serial_number: Option<String>,
    pub operational_unit: String,
    pub record_date: DateTime<Utc>,
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Uuid,
}
