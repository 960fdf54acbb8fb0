//! Assignment domain model — one immutable audit record of an ASSIGN
//! or UNASSIGN event. Append-only; owned by the product and
//! cascade-deleted with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentAction {
    Assign,
    Unassign,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub product_id: Uuid,
    pub action: AssignmentAction,
    pub assigned_to: String,
    pub assigned_email: Option<String>,
    pub assigned_ad_account: Option<String>,
    pub location: String,
    /// Effective date of the event, not the insertion time.
    pub assignment_date: DateTime<Utc>,
    pub performed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAssignment {
    pub product_id: Uuid,
    pub action: AssignmentAction,
    pub assigned_to: String,
    pub assigned_email: Option<String>,
    pub assigned_ad_account: Option<String>,
    pub location: String,
    pub assignment_date: DateTime<Utc>,
    pub performed_by: Uuid,
    pub notes: Option<String>,
}
