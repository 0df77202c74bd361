use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

use super::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "escalation_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Assignment,
    Escalation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "escalation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    Resolved,
    Forwarded,
    Escalated,
}

/// One hop of a complaint's routing history. Never deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub escalated_by: Uuid,
    pub escalated_to_role: UserRole,
    pub escalated_to: Option<Uuid>,
    pub department: Option<String>,
    pub action_type: ActionType,
    pub status: EscalationStatus,
    pub original_handler: Uuid,
    pub resolution_details: Option<String>,
    pub created_at: OffsetDateTime,
    pub resolved_at: Option<OffsetDateTime>,
}

impl EscalationEntry {
    pub fn is_pending(&self) -> bool {
        self.status == EscalationStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEscalation {
    pub complaint_id: Uuid,
    pub escalated_by: Uuid,
    pub escalated_to_role: UserRole,
    pub escalated_to: Option<Uuid>,
    pub department: Option<String>,
    pub action_type: ActionType,
    pub original_handler: Uuid,
}

/// Moves a pending entry to one of its terminal states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySettlement {
    pub entry_id: Uuid,
    pub status: EscalationStatus,
    pub resolution_details: Option<String>,
}
