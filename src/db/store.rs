use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DbResult;
use super::models::{
    Complaint, ComplaintUpdate, Decision, EntrySettlement, EscalationEntry, NewComplaint,
    NewDecision, NewEscalation, NewNotification, NewReport, Notification, StereotypedReport,
};

/// Preconditions checked inside the transaction, after the complaint row is
/// locked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionGuard {
    /// Reject when the complaint is already resolved.
    pub require_open: bool,
    /// Reject when any ledger entry for the complaint is still pending.
    pub require_no_pending: bool,
}

/// Every mutation one workflow action makes, applied as a single unit.
///
/// Stores must either apply all of it or none of it. The settled entry is
/// only flipped if it is still pending at apply time.
#[derive(Debug, Clone)]
pub struct Transition {
    pub complaint_id: Uuid,
    pub guard: TransitionGuard,
    pub settle: Option<EntrySettlement>,
    pub new_entry: Option<NewEscalation>,
    pub complaint: Option<ComplaintUpdate>,
    pub decision: Option<NewDecision>,
    pub notifications: Vec<NewNotification>,
    pub report: Option<NewReport>,
    pub at: OffsetDateTime,
}

impl Transition {
    pub fn new(complaint_id: Uuid, at: OffsetDateTime) -> Self {
        Self {
            complaint_id,
            guard: TransitionGuard::default(),
            settle: None,
            new_entry: None,
            complaint: None,
            decision: None,
            notifications: Vec::new(),
            report: None,
            at,
        }
    }
}

/// Rows written by a committed transition.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedTransition {
    pub complaint: Complaint,
    pub settled: Option<EscalationEntry>,
    pub entry: Option<EscalationEntry>,
    pub decision: Option<Decision>,
    pub notifications: Vec<Notification>,
    pub report: Option<StereotypedReport>,
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn create_complaint(&self, complaint: NewComplaint) -> DbResult<Complaint>;
    async fn get_complaint(&self, complaint_id: Uuid) -> DbResult<Option<Complaint>>;
}

/// Routing history. Entries are only ever inserted or settled.
#[async_trait]
pub trait EscalationLedger: Send + Sync {
    async fn get_entry(&self, entry_id: Uuid) -> DbResult<Option<EscalationEntry>>;

    /// Most recently created entry for the complaint.
    async fn latest_entry(&self, complaint_id: Uuid) -> DbResult<Option<EscalationEntry>>;

    async fn pending_entry_for(
        &self,
        complaint_id: Uuid,
        user_id: Uuid,
    ) -> DbResult<Option<EscalationEntry>>;

    /// Pending entries addressed to the user, oldest first.
    async fn list_pending_for(&self, user_id: Uuid) -> DbResult<Vec<EscalationEntry>>;

    /// All entries for the complaint in creation order.
    async fn list_entries(&self, complaint_id: Uuid) -> DbResult<Vec<EscalationEntry>>;
}

#[async_trait]
pub trait DecisionLog: Send + Sync {
    async fn list_decisions(&self, complaint_id: Uuid) -> DbResult<Vec<Decision>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn get_notification(&self, notification_id: Uuid) -> DbResult<Option<Notification>>;

    /// Inbox for a user, newest first.
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool)
        -> DbResult<Vec<Notification>>;

    async fn list_complaint_notifications(&self, complaint_id: Uuid)
        -> DbResult<Vec<Notification>>;

    /// Marks the notification read. Already-read notifications keep their
    /// original `read_at`.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        at: OffsetDateTime,
    ) -> DbResult<Notification>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Reports addressed to the recipient, oldest first.
    async fn list_reports_for(&self, recipient_id: Uuid) -> DbResult<Vec<StereotypedReport>>;

    async fn list_complaint_reports(&self, complaint_id: Uuid)
        -> DbResult<Vec<StereotypedReport>>;
}

#[async_trait]
pub trait TransitionStore: Send + Sync {
    /// Applies the transition atomically.
    ///
    /// Fails with `StaleEntry` if the settled entry is no longer pending,
    /// `Duplicate` if the new entry would give its recipient a second pending
    /// entry for the complaint, and `Conflict` if a guard does not hold.
    async fn apply(&self, transition: Transition) -> DbResult<AppliedTransition>;

    async fn ping(&self) -> DbResult<()>;
}

/// Storage bundle the workflow engine runs against.
pub trait WorkflowStore:
    ComplaintStore + EscalationLedger + DecisionLog + NotificationStore + ReportStore + TransitionStore
{
}

impl<T> WorkflowStore for T where
    T: ComplaintStore
        + EscalationLedger
        + DecisionLog
        + NotificationStore
        + ReportStore
        + TransitionStore
{
}
