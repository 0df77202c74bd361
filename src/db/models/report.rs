use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Resolved,
    Escalated,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Resolved => "resolved",
            ReportType::Escalated => "escalated",
        }
    }
}

/// Audit snapshot filed for the top authority. Immutable once written; the
/// body is rendered at filing time and never re-joined against the complaint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct StereotypedReport {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub report_type: ReportType,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub report_type: ReportType,
    pub body: String,
}
