//! Product model (catalog entry) — describes a class of asset, as
//! opposed to the individual serialized units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductModel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub part_number: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProductModel {
    pub name: String,
    pub description: Option<String>,
    pub part_number: String,
    pub created_by: Option<Uuid>,
}
