//! In-memory workflow store.
//!
//! Deterministic and test-friendly. All tables sit behind one lock so a
//! transition is checked and applied as a unit; production deployments use
//! [`crate::db::PgWorkflowStore`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::error::{DatabaseError, DbResult};
use super::models::{
    Complaint, ComplaintStatus, Decision, EscalationEntry, EscalationStatus, NewComplaint,
    Notification, StereotypedReport,
};
use super::store::{
    AppliedTransition, ComplaintStore, DecisionLog, EscalationLedger, NotificationStore,
    ReportStore, Transition, TransitionStore,
};

#[derive(Default)]
struct Tables {
    complaints: BTreeMap<Uuid, Complaint>,
    entries: Vec<EscalationEntry>,
    decisions: Vec<Decision>,
    notifications: Vec<Notification>,
    reports: Vec<StereotypedReport>,
}

#[derive(Default)]
pub struct MemoryWorkflowStore {
    tables: RwLock<Tables>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DbResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| DatabaseError::Backend("workflow tables lock poisoned".to_string()))
    }

    fn write(&self) -> DbResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| DatabaseError::Backend("workflow tables lock poisoned".to_string()))
    }
}

#[async_trait]
impl ComplaintStore for MemoryWorkflowStore {
    async fn create_complaint(&self, complaint: NewComplaint) -> DbResult<Complaint> {
        complaint
            .validate()
            .map_err(|e| DatabaseError::InvalidInput(e.to_string()))?;

        let now = OffsetDateTime::now_utc();
        let record = Complaint {
            id: Uuid::now_v7(),
            title: complaint.title,
            description: complaint.description,
            category: complaint.category,
            visibility: complaint.visibility,
            status: complaint.status,
            resolution_details: None,
            resolved_at: None,
            submitted_by: complaint.submitted_by,
            created_at: now,
            updated_at: now,
        };
        self.write()?.complaints.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_complaint(&self, complaint_id: Uuid) -> DbResult<Option<Complaint>> {
        Ok(self.read()?.complaints.get(&complaint_id).cloned())
    }
}

#[async_trait]
impl EscalationLedger for MemoryWorkflowStore {
    async fn get_entry(&self, entry_id: Uuid) -> DbResult<Option<EscalationEntry>> {
        Ok(self.read()?.entries.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn latest_entry(&self, complaint_id: Uuid) -> DbResult<Option<EscalationEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .rev()
            .find(|e| e.complaint_id == complaint_id)
            .cloned())
    }

    async fn pending_entry_for(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<EscalationEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .find(|e| {
                e.complaint_id == complaint_id
                    && e.escalated_to == Some(user_id)
                    && e.is_pending()
            })
            .cloned())
    }

    async fn list_pending_for(&self, user_id: Uuid) -> DbResult<Vec<EscalationEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|e| e.escalated_to == Some(user_id) && e.is_pending())
            .cloned()
            .collect())
    }

    async fn list_entries(&self, complaint_id: Uuid) -> DbResult<Vec<EscalationEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|e| e.complaint_id == complaint_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DecisionLog for MemoryWorkflowStore {
    async fn list_decisions(&self, complaint_id: Uuid) -> DbResult<Vec<Decision>> {
        Ok(self
            .read()?
            .decisions
            .iter()
            .filter(|d| d.complaint_id == complaint_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryWorkflowStore {
    async fn get_notification(&self, notification_id: Uuid) -> DbResult<Option<Notification>> {
        Ok(self
            .read()?
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> DbResult<Vec<Notification>> {
        Ok(self
            .read()?
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect())
    }

    async fn list_complaint_notifications(
        &self,
        complaint_id: Uuid,
    ) -> DbResult<Vec<Notification>> {
        Ok(self
            .read()?
            .notifications
            .iter()
            .filter(|n| n.complaint_id == Some(complaint_id))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        at: OffsetDateTime,
    ) -> DbResult<Notification> {
        let mut tables = self.write()?;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("notification {}", notification_id)))?;
        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(at);
        }
        Ok(notification.clone())
    }
}

#[async_trait]
impl ReportStore for MemoryWorkflowStore {
    async fn list_reports_for(&self, recipient_id: Uuid) -> DbResult<Vec<StereotypedReport>> {
        Ok(self
            .read()?
            .reports
            .iter()
            .filter(|r| r.recipient_id == recipient_id)
            .cloned()
            .collect())
    }

    async fn list_complaint_reports(
        &self,
        complaint_id: Uuid,
    ) -> DbResult<Vec<StereotypedReport>> {
        Ok(self
            .read()?
            .reports
            .iter()
            .filter(|r| r.complaint_id == complaint_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransitionStore for MemoryWorkflowStore {
    async fn apply(&self, transition: Transition) -> DbResult<AppliedTransition> {
        let mut tables = self.write()?;
        let Transition {
            complaint_id,
            guard,
            settle,
            new_entry,
            complaint: complaint_update,
            decision,
            notifications,
            report,
            at,
        } = transition;

        // Check everything before the first write.
        let current = tables
            .complaints
            .get(&complaint_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("complaint {}", complaint_id)))?;
        if guard.require_open && current.status == ComplaintStatus::Resolved {
            return Err(DatabaseError::Conflict(format!(
                "complaint {} is already resolved",
                complaint_id
            )));
        }
        if guard.require_no_pending
            && tables
                .entries
                .iter()
                .any(|e| e.complaint_id == complaint_id && e.is_pending())
        {
            return Err(DatabaseError::Conflict(format!(
                "complaint {} has a pending escalation",
                complaint_id
            )));
        }

        let settle_index = match &settle {
            Some(settlement) => {
                let index = tables
                    .entries
                    .iter()
                    .position(|e| e.id == settlement.entry_id)
                    .ok_or_else(|| {
                        DatabaseError::NotFound(format!("escalation {}", settlement.entry_id))
                    })?;
                if !tables.entries[index].is_pending() {
                    return Err(DatabaseError::StaleEntry(settlement.entry_id));
                }
                Some(index)
            }
            None => None,
        };

        if let Some(new) = &new_entry {
            let settled_id = settle.as_ref().map(|s| s.entry_id);
            let clash = new.escalated_to.is_some()
                && tables.entries.iter().any(|e| {
                    e.complaint_id == new.complaint_id
                        && e.escalated_to == new.escalated_to
                        && e.is_pending()
                        && Some(e.id) != settled_id
                });
            if clash {
                return Err(DatabaseError::Duplicate(format!(
                    "pending escalation for complaint {} already addressed to that recipient",
                    new.complaint_id
                )));
            }
        }

        let settled = match (settle, settle_index) {
            (Some(settlement), Some(index)) => {
                let entry = &mut tables.entries[index];
                entry.status = settlement.status;
                entry.resolution_details = settlement.resolution_details;
                entry.resolved_at = Some(at);
                Some(entry.clone())
            }
            _ => None,
        };

        let entry = new_entry.map(|new| {
            let entry = EscalationEntry {
                id: Uuid::now_v7(),
                complaint_id: new.complaint_id,
                escalated_by: new.escalated_by,
                escalated_to_role: new.escalated_to_role,
                escalated_to: new.escalated_to,
                department: new.department,
                action_type: new.action_type,
                status: EscalationStatus::Pending,
                original_handler: new.original_handler,
                resolution_details: None,
                created_at: at,
                resolved_at: None,
            };
            tables.entries.push(entry.clone());
            entry
        });

        let complaint = {
            let record = tables
                .complaints
                .get_mut(&complaint_id)
                .ok_or_else(|| DatabaseError::NotFound(format!("complaint {}", complaint_id)))?;
            if let Some(update) = complaint_update {
                record.status = update.status;
                record.resolution_details = update.resolution_details;
                record.resolved_at = update.resolved_at;
                record.updated_at = at;
            }
            record.clone()
        };

        let decision = decision.map(|new| {
            let decision = Decision {
                id: Uuid::now_v7(),
                escalation_id: new.escalation_id,
                complaint_id: new.complaint_id,
                sender_id: new.sender_id,
                receiver_id: new.receiver_id,
                decision_text: new.decision_text,
                status: new.status,
                created_at: at,
            };
            tables.decisions.push(decision.clone());
            decision
        });

        let notifications = notifications
            .into_iter()
            .map(|new| {
                let notification = Notification {
                    id: Uuid::now_v7(),
                    user_id: new.user_id,
                    complaint_id: new.complaint_id,
                    notification_type: new.notification_type,
                    description: new.description,
                    is_read: false,
                    created_at: at,
                    read_at: None,
                };
                tables.notifications.push(notification.clone());
                notification
            })
            .collect();

        let report = report.map(|new| {
            let report = StereotypedReport {
                id: Uuid::now_v7(),
                complaint_id: new.complaint_id,
                sender_id: new.sender_id,
                recipient_id: new.recipient_id,
                report_type: new.report_type,
                body: new.body,
                created_at: at,
            };
            tables.reports.push(report.clone());
            report
        });

        Ok(AppliedTransition {
            complaint,
            settled,
            entry,
            decision,
            notifications,
            report,
        })
    }

    async fn ping(&self) -> DbResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        ActionType, ComplaintVisibility, EntrySettlement, NewEscalation, NewNotification,
        NotificationType, UserRole,
    };

    async fn seeded() -> (MemoryWorkflowStore, Complaint) {
        let store = MemoryWorkflowStore::new();
        let complaint = store
            .create_complaint(NewComplaint {
                title: "Broken projector".to_string(),
                description: "Room 101 projector has been broken for weeks".to_string(),
                category: None,
                visibility: ComplaintVisibility::Public,
                status: ComplaintStatus::InProgress,
                submitted_by: Uuid::from_u128(1),
            })
            .await
            .unwrap();
        (store, complaint)
    }

    fn assignment(complaint_id: Uuid, to: u128) -> NewEscalation {
        NewEscalation {
            complaint_id,
            escalated_by: Uuid::from_u128(10),
            escalated_to_role: UserRole::DepartmentHead,
            escalated_to: Some(Uuid::from_u128(to)),
            department: Some("CS".to_string()),
            action_type: ActionType::Assignment,
            original_handler: Uuid::from_u128(10),
        }
    }

    #[tokio::test]
    async fn rejects_invalid_intake() {
        let store = MemoryWorkflowStore::new();
        let result = store
            .create_complaint(NewComplaint {
                title: String::new(),
                description: "x".to_string(),
                category: None,
                visibility: ComplaintVisibility::Private,
                status: ComplaintStatus::Pending,
                submitted_by: Uuid::from_u128(1),
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn second_pending_entry_for_same_recipient_is_duplicate() {
        let (store, complaint) = seeded().await;
        let mut first = Transition::new(complaint.id, OffsetDateTime::now_utc());
        first.new_entry = Some(assignment(complaint.id, 20));
        store.apply(first).await.unwrap();

        let mut second = Transition::new(complaint.id, OffsetDateTime::now_utc());
        second.new_entry = Some(assignment(complaint.id, 20));
        second.notifications.push(NewNotification {
            user_id: Uuid::from_u128(20),
            complaint_id: Some(complaint.id),
            notification_type: NotificationType::ComplaintAssigned,
            description: "dup".to_string(),
        });
        let result = store.apply(second).await;
        assert!(matches!(result, Err(DatabaseError::Duplicate(_))));

        assert_eq!(store.list_entries(complaint.id).await.unwrap().len(), 1);
        assert!(store
            .list_complaint_notifications(complaint.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn settling_a_settled_entry_is_stale_and_writes_nothing() {
        let (store, complaint) = seeded().await;
        let mut assign = Transition::new(complaint.id, OffsetDateTime::now_utc());
        assign.new_entry = Some(assignment(complaint.id, 20));
        let entry = store.apply(assign).await.unwrap().entry.unwrap();

        let settle = |details: &str| {
            let mut t = Transition::new(complaint.id, OffsetDateTime::now_utc());
            t.settle = Some(EntrySettlement {
                entry_id: entry.id,
                status: EscalationStatus::Resolved,
                resolution_details: Some(details.to_string()),
            });
            t.notifications.push(NewNotification {
                user_id: Uuid::from_u128(1),
                complaint_id: Some(complaint.id),
                notification_type: NotificationType::ComplaintResolved,
                description: details.to_string(),
            });
            t
        };

        store.apply(settle("first decision")).await.unwrap();
        let result = store.apply(settle("second decision")).await;
        assert!(matches!(result, Err(DatabaseError::StaleEntry(id)) if id == entry.id));

        let stored = store.get_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.resolution_details.as_deref(), Some("first decision"));
        assert_eq!(
            store.list_complaint_notifications(complaint.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn mark_read_keeps_first_read_timestamp() {
        let (store, complaint) = seeded().await;
        let mut t = Transition::new(complaint.id, OffsetDateTime::now_utc());
        t.notifications.push(NewNotification {
            user_id: Uuid::from_u128(1),
            complaint_id: Some(complaint.id),
            notification_type: NotificationType::ComplaintAssigned,
            description: "hello".to_string(),
        });
        let id = store.apply(t).await.unwrap().notifications[0].id;

        let first_at = OffsetDateTime::now_utc();
        let first = store.mark_notification_read(id, first_at).await.unwrap();
        let again = store
            .mark_notification_read(id, first_at + time::Duration::hours(1))
            .await
            .unwrap();
        assert!(first.is_read);
        assert_eq!(again.read_at, Some(first_at));
        assert!(store
            .list_notifications(Uuid::from_u128(1), true)
            .await
            .unwrap()
            .is_empty());
    }
}
