//! Input and permission checks. Pure functions of their arguments so callers
//! and tests can exercise them without storage.

use uuid::Uuid;
use validator::Validate;

use super::error::{WorkflowError, WorkflowResult};
use super::Actor;
use crate::db::EscalationEntry;

pub const MIN_DETAILS_LEN: usize = 10;
pub const MAX_DETAILS_LEN: usize = 1000;

#[derive(Debug, Validate)]
struct DetailsText {
    #[validate(length(min = 10, max = 1000, message = "Details must be between 10 and 1000 characters"))]
    text: String,
}

/// Trims and length-checks decision, escalation and resolution text.
pub fn details_text(raw: &str) -> WorkflowResult<String> {
    let details = DetailsText {
        text: raw.trim().to_string(),
    };
    details.validate().map_err(|e| {
        WorkflowError::InvalidInput(format!(
            "details must be {}-{} characters ({})",
            MIN_DETAILS_LEN, MAX_DETAILS_LEN, e
        ))
    })?;
    Ok(details.text)
}

/// Optional routing hint; blank means none.
pub fn department_hint(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Decides whether `actor` may act on `entry`.
///
/// `role_holder` is the directory's answer for the entry's role and is only
/// consulted when the entry has not been resolved to a user yet. Addressing
/// is checked before status so a stranger learns nothing about the entry.
pub fn authorize_entry(
    entry: &EscalationEntry,
    actor: &Actor,
    role_holder: Option<Uuid>,
) -> WorkflowResult<()> {
    let addressed = match entry.escalated_to {
        Some(recipient) => recipient == actor.id,
        None => entry.escalated_to_role == actor.role && role_holder == Some(actor.id),
    };
    if !addressed {
        return Err(WorkflowError::NotAuthorized(format!(
            "escalation {} is not addressed to {}",
            entry.id, actor.id
        )));
    }
    if !entry.is_pending() {
        return Err(WorkflowError::AlreadyProcessed(format!(
            "escalation {} is {:?}",
            entry.id, entry.status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ActionType, EscalationStatus, UserRole};
    use time::OffsetDateTime;

    fn entry(escalated_to: Option<Uuid>, status: EscalationStatus) -> EscalationEntry {
        EscalationEntry {
            id: Uuid::from_u128(100),
            complaint_id: Uuid::from_u128(42),
            escalated_by: Uuid::from_u128(10),
            escalated_to_role: UserRole::DepartmentHead,
            escalated_to,
            department: Some("CS".to_string()),
            action_type: ActionType::Assignment,
            status,
            original_handler: Uuid::from_u128(10),
            resolution_details: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            resolved_at: None,
        }
    }

    fn head(id: u128) -> Actor {
        Actor::new(Uuid::from_u128(id), UserRole::DepartmentHead)
    }

    #[test]
    fn details_are_trimmed_and_bounded() {
        assert_eq!(details_text("  Fixed the issue.  ").unwrap(), "Fixed the issue.");
        assert!(matches!(details_text("too short"), Err(WorkflowError::InvalidInput(_))));
        assert!(matches!(details_text("          x         "), Err(WorkflowError::InvalidInput(_))));
        assert!(details_text(&"a".repeat(MAX_DETAILS_LEN)).is_ok());
        assert!(details_text(&"a".repeat(MAX_DETAILS_LEN + 1)).is_err());
        // Counted in characters, not bytes.
        assert!(details_text(&"é".repeat(MAX_DETAILS_LEN)).is_ok());
    }

    #[test]
    fn addressed_recipient_is_allowed() {
        let e = entry(Some(Uuid::from_u128(20)), EscalationStatus::Pending);
        assert!(authorize_entry(&e, &head(20), None).is_ok());
    }

    #[test]
    fn stranger_is_rejected_before_status_is_revealed() {
        let e = entry(Some(Uuid::from_u128(20)), EscalationStatus::Resolved);
        assert!(matches!(
            authorize_entry(&e, &head(21), None),
            Err(WorkflowError::NotAuthorized(_))
        ));
        assert!(matches!(
            authorize_entry(&e, &head(20), None),
            Err(WorkflowError::AlreadyProcessed(_))
        ));
    }

    #[test]
    fn unresolved_entry_requires_role_and_directory_match() {
        let e = entry(None, EscalationStatus::Pending);
        assert!(authorize_entry(&e, &head(20), Some(Uuid::from_u128(20))).is_ok());
        assert!(authorize_entry(&e, &head(20), Some(Uuid::from_u128(21))).is_err());
        let dean = Actor::new(Uuid::from_u128(20), UserRole::CollegeDean);
        assert!(authorize_entry(&e, &dean, Some(Uuid::from_u128(20))).is_err());
    }

    #[test]
    fn blank_department_hint_is_none() {
        assert_eq!(department_hint(Some("  ")), None);
        assert_eq!(department_hint(Some(" CS ")), Some("CS".to_string()));
        assert_eq!(department_hint(None), None);
    }
}
