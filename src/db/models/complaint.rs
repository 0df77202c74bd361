use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    Validated,
    InProgress,
    Assigned,
    Escalated,
    Resolved,
    Rejected,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Validated => "validated",
            ComplaintStatus::InProgress => "in_progress",
            ComplaintStatus::Assigned => "assigned",
            ComplaintStatus::Escalated => "escalated",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "complaint_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplaintVisibility {
    Public,
    Private,
    Anonymous,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub visibility: ComplaintVisibility,
    pub status: ComplaintStatus,
    pub resolution_details: Option<String>,
    pub resolved_at: Option<OffsetDateTime>,
    pub submitted_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Intake payload. Complaints are created outside the workflow and only
/// mutated by it afterwards.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComplaint {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: String,
    pub category: Option<String>,
    pub visibility: ComplaintVisibility,
    pub status: ComplaintStatus,
    pub submitted_by: Uuid,
}

/// Replacement values for the mutable part of a complaint. `None` clears the
/// resolution fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintUpdate {
    pub status: ComplaintStatus,
    pub resolution_details: Option<String>,
    pub resolved_at: Option<OffsetDateTime>,
}
