use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "decision_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Final,
    ActionRequired,
}

/// Append-only record of a formal decision.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub escalation_id: Option<Uuid>, // None for first-line resolutions
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub decision_text: String,
    pub status: DecisionStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDecision {
    pub escalation_id: Option<Uuid>,
    pub complaint_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub decision_text: String,
    pub status: DecisionStatus,
}
