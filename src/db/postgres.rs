//! PostgreSQL backend: the transactional source of truth.

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use super::error::{DatabaseError, DbResult};
use super::models::{
    Complaint, ComplaintStatus, Decision, EscalationEntry, NewComplaint, Notification,
    StereotypedReport, User, UserRole,
};
use super::repositories::{
    ComplaintRepository, DecisionRepository, EscalationRepository, NotificationRepository,
    ReportRepository, UserRepository,
};
use super::store::{
    AppliedTransition, ComplaintStore, DecisionLog, EscalationLedger, NotificationStore,
    ReportStore, Transition, TransitionStore,
};
use crate::workflow::Directory;

#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for PgWorkflowStore {
    async fn create_complaint(&self, complaint: NewComplaint) -> DbResult<Complaint> {
        complaint
            .validate()
            .map_err(|e| DatabaseError::InvalidInput(e.to_string()))?;
        Ok(ComplaintRepository::create(&self.pool, &complaint).await?)
    }

    async fn get_complaint(&self, complaint_id: Uuid) -> DbResult<Option<Complaint>> {
        Ok(ComplaintRepository::get_by_id(&self.pool, complaint_id).await?)
    }
}

#[async_trait]
impl EscalationLedger for PgWorkflowStore {
    async fn get_entry(&self, entry_id: Uuid) -> DbResult<Option<EscalationEntry>> {
        Ok(EscalationRepository::get_by_id(&self.pool, entry_id).await?)
    }

    async fn latest_entry(&self, complaint_id: Uuid) -> DbResult<Option<EscalationEntry>> {
        Ok(EscalationRepository::latest_for_complaint(&self.pool, complaint_id).await?)
    }

    async fn pending_entry_for(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<EscalationEntry>> {
        Ok(EscalationRepository::pending_for(&self.pool, complaint_id, user_id).await?)
    }

    async fn list_pending_for(&self, user_id: Uuid) -> DbResult<Vec<EscalationEntry>> {
        Ok(EscalationRepository::list_pending_for_user(&self.pool, user_id).await?)
    }

    async fn list_entries(&self, complaint_id: Uuid) -> DbResult<Vec<EscalationEntry>> {
        Ok(EscalationRepository::list_for_complaint(&self.pool, complaint_id).await?)
    }
}

#[async_trait]
impl DecisionLog for PgWorkflowStore {
    async fn list_decisions(&self, complaint_id: Uuid) -> DbResult<Vec<Decision>> {
        Ok(DecisionRepository::list_for_complaint(&self.pool, complaint_id).await?)
    }
}

#[async_trait]
impl NotificationStore for PgWorkflowStore {
    async fn get_notification(&self, notification_id: Uuid) -> DbResult<Option<Notification>> {
        Ok(NotificationRepository::get_by_id(&self.pool, notification_id).await?)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> DbResult<Vec<Notification>> {
        Ok(NotificationRepository::list_for_user(&self.pool, user_id, unread_only).await?)
    }

    async fn list_complaint_notifications(
        &self,
        complaint_id: Uuid,
    ) -> DbResult<Vec<Notification>> {
        Ok(NotificationRepository::list_for_complaint(&self.pool, complaint_id).await?)
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        at: OffsetDateTime,
    ) -> DbResult<Notification> {
        NotificationRepository::mark_read(&self.pool, notification_id, at)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("notification {}", notification_id)))
    }
}

#[async_trait]
impl ReportStore for PgWorkflowStore {
    async fn list_reports_for(&self, recipient_id: Uuid) -> DbResult<Vec<StereotypedReport>> {
        Ok(ReportRepository::list_for_recipient(&self.pool, recipient_id).await?)
    }

    async fn list_complaint_reports(
        &self,
        complaint_id: Uuid,
    ) -> DbResult<Vec<StereotypedReport>> {
        Ok(ReportRepository::list_for_complaint(&self.pool, complaint_id).await?)
    }
}

#[async_trait]
impl TransitionStore for PgWorkflowStore {
    async fn apply(&self, transition: Transition) -> DbResult<AppliedTransition> {
        // Dropping `tx` on any early return rolls everything back.
        let mut tx = self.pool.begin().await?;
        let at = transition.at;

        let mut complaint = ComplaintRepository::lock_for_update(&mut tx, transition.complaint_id)
            .await?
            .ok_or_else(|| {
                DatabaseError::NotFound(format!("complaint {}", transition.complaint_id))
            })?;

        if transition.guard.require_open && complaint.status == ComplaintStatus::Resolved {
            return Err(DatabaseError::Conflict(format!(
                "complaint {} is already resolved",
                complaint.id
            )));
        }
        if transition.guard.require_no_pending
            && EscalationRepository::count_pending(&mut tx, complaint.id).await? > 0
        {
            return Err(DatabaseError::Conflict(format!(
                "complaint {} has a pending escalation",
                complaint.id
            )));
        }

        let settled = match &transition.settle {
            Some(settlement) => Some(
                EscalationRepository::settle(&mut tx, settlement, at)
                    .await?
                    .ok_or(DatabaseError::StaleEntry(settlement.entry_id))?,
            ),
            None => None,
        };

        let entry = match &transition.new_entry {
            Some(new) => Some(
                EscalationRepository::insert(&mut tx, new, at)
                    .await
                    .map_err(|e| DatabaseError::from_insert(e, "pending escalation for recipient"))?,
            ),
            None => None,
        };

        if let Some(update) = &transition.complaint {
            complaint = ComplaintRepository::apply_update(&mut tx, complaint.id, update, at).await?;
        }

        let decision = match &transition.decision {
            Some(new) => Some(DecisionRepository::insert(&mut tx, new, at).await?),
            None => None,
        };

        let mut notifications = Vec::with_capacity(transition.notifications.len());
        for new in &transition.notifications {
            notifications.push(NotificationRepository::insert(&mut tx, new, at).await?);
        }

        let report = match &transition.report {
            Some(new) => Some(ReportRepository::insert(&mut tx, new, at).await?),
            None => None,
        };

        tx.commit().await?;
        debug!(complaint_id = %complaint.id, "Transition committed");

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
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Directory backed by the `users` table.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn resolve_user(
        &self,
        role: UserRole,
        department: Option<&str>,
    ) -> DbResult<Option<Uuid>> {
        Ok(UserRepository::resolve_role_holder(&self.pool, role, department).await?)
    }

    async fn find_user(&self, user_id: Uuid) -> DbResult<Option<User>> {
        Ok(UserRepository::get_user_by_id(&self.pool, user_id).await?)
    }
}
