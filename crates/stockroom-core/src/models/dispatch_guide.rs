//! Dispatch guide domain model — a vendor delivery receipt backing a
//! batch of incoming assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchGuide {
    pub id: Uuid,
    /// Unique across all guides.
    pub guide_number: String,
    pub vendor: String,
    pub dispatch_date: DateTime<Utc>,
    /// Original filename as uploaded.
    pub file_name: String,
    /// Name of the file on disk in the upload directory.
    pub stored_file_name: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDispatchGuide {
    pub guide_number: String,
    pub vendor: String,
    pub dispatch_date: DateTime<Utc>,
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Uuid,
}
