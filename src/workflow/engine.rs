use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::audit::AuditReporter;
use super::directory::Directory;
use super::error::{WorkflowError, WorkflowResult};
use super::fanout::{FanOut, Stakeholders};
use super::mailer::{Mailer, TracingMailer};
use super::validation;
use super::Actor;
use crate::db::{
    ActionType, AppliedTransition, Complaint, ComplaintStatus, ComplaintUpdate, Decision,
    DecisionStatus, EntrySettlement, EscalationEntry, EscalationStatus, NewDecision,
    NewEscalation, Notification, ReportType, StereotypedReport, Transition, UserRole,
    WorkflowStore,
};

/// What the recipient of a pending entry decides to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Resolve,
    EscalateToNextRole,
    /// Hand the complaint back to its original handler without closing it.
    RequireAction,
}

/// Who an explicit escalation goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// A named user who must hold the target role.
    User(Uuid),
    /// Resolve the target role through the directory, scoped by department
    /// when the role is department-scoped.
    Department(Option<String>),
}

#[derive(Debug, Clone)]
pub struct EscalationRequest {
    pub complaint_id: Uuid,
    pub entry_id: Uuid,
    pub target_role: UserRole,
    pub target: RouteTarget,
    pub reason: String,
}

/// Read-only audit view of one complaint.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub complaint: Complaint,
    pub ledger_entries: Vec<EscalationEntry>,
    pub decisions: Vec<Decision>,
    pub notifications: Vec<Notification>,
    pub reports: Vec<StereotypedReport>,
}

/// A resolved next hop.
#[derive(Debug, Clone)]
struct Route {
    user_id: Uuid,
    role: UserRole,
    department: Option<String>,
    settles_as: EscalationStatus,
}

/// Orchestrates complaint transitions. Each public action validates, builds
/// one [`Transition`] and hands it to the store to apply atomically.
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn Mailer>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn WorkflowStore>, directory: Arc<dyn Directory>) -> Self {
        Self {
            store,
            directory,
            mailer: Arc::new(TracingMailer),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn store(&self) -> &dyn WorkflowStore {
        self.store.as_ref()
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Pending entries addressed to the user, oldest first.
    pub async fn list_pending_for(&self, user_id: Uuid) -> WorkflowResult<Vec<EscalationEntry>> {
        let result = self
            .store
            .list_pending_for(user_id)
            .await
            .map_err(WorkflowError::from);
        observe("list_pending_for", user_id, result)
    }

    pub async fn decide(
        &self,
        actor: Actor,
        entry_id: Uuid,
        outcome: Outcome,
        details: &str,
    ) -> WorkflowResult<AppliedTransition> {
        let result = self.try_decide(actor, entry_id, outcome, details).await;
        self.finish("decide", actor, result)
    }

    pub async fn escalate(
        &self,
        actor: Actor,
        request: EscalationRequest,
    ) -> WorkflowResult<AppliedTransition> {
        let result = self.try_escalate(actor, request).await;
        self.finish("escalate", actor, result)
    }

    /// First hop (handler to department head) or lateral re-routing.
    pub async fn assign(
        &self,
        actor: Actor,
        complaint_id: Uuid,
        target_role: UserRole,
        target_department: Option<&str>,
    ) -> WorkflowResult<AppliedTransition> {
        let result = self
            .try_assign(actor, complaint_id, target_role, target_department)
            .await;
        self.finish("assign", actor, result)
    }

    /// A handler closes a complaint that was never routed onward.
    pub async fn resolve_first_line(
        &self,
        actor: Actor,
        complaint_id: Uuid,
        details: &str,
    ) -> WorkflowResult<AppliedTransition> {
        let result = self.try_resolve_first_line(actor, complaint_id, details).await;
        self.finish("resolve_first_line", actor, result)
    }

    pub async fn get_history(&self, complaint_id: Uuid) -> WorkflowResult<History> {
        let result = self.load_history(complaint_id).await;
        observe("get_history", complaint_id, result)
    }

    pub async fn notifications_for(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> WorkflowResult<Vec<Notification>> {
        let result = self
            .store
            .list_notifications(user_id, unread_only)
            .await
            .map_err(WorkflowError::from);
        observe("notifications_for", user_id, result)
    }

    pub async fn mark_notification_read(
        &self,
        actor: Actor,
        notification_id: Uuid,
    ) -> WorkflowResult<Notification> {
        let result = self.try_mark_read(actor, notification_id).await;
        observe("mark_notification_read", actor.id, result)
    }

    /// Audit reports addressed to the actor, oldest first. Top authority only.
    pub async fn reports_for(&self, actor: Actor) -> WorkflowResult<Vec<StereotypedReport>> {
        let result = if actor.role.is_top_authority() {
            self.store
                .list_reports_for(actor.id)
                .await
                .map_err(WorkflowError::from)
        } else {
            Err(WorkflowError::NotAuthorized(format!(
                "{} cannot review audit reports",
                actor.role
            )))
        };
        observe("reports_for", actor.id, result)
    }

    async fn load_history(&self, complaint_id: Uuid) -> WorkflowResult<History> {
        let complaint = self.complaint(complaint_id).await?;
        Ok(History {
            complaint,
            ledger_entries: self.store.list_entries(complaint_id).await?,
            decisions: self.store.list_decisions(complaint_id).await?,
            notifications: self.store.list_complaint_notifications(complaint_id).await?,
            reports: self.store.list_complaint_reports(complaint_id).await?,
        })
    }

    async fn try_mark_read(&self, actor: Actor, notification_id: Uuid) -> WorkflowResult<Notification> {
        let notification = self
            .store
            .get_notification(notification_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("notification {}", notification_id)))?;
        if notification.user_id != actor.id {
            return Err(WorkflowError::NotAuthorized(format!(
                "notification {} belongs to another user",
                notification_id
            )));
        }
        Ok(self
            .store
            .mark_notification_read(notification_id, OffsetDateTime::now_utc())
            .await?)
    }

    async fn try_decide(
        &self,
        actor: Actor,
        entry_id: Uuid,
        outcome: Outcome,
        details: &str,
    ) -> WorkflowResult<AppliedTransition> {
        let details = validation::details_text(details)?;
        let entry = self.addressed_entry(actor, entry_id).await?;
        let complaint = self.complaint(entry.complaint_id).await?;

        match outcome {
            Outcome::Resolve => {
                require_decide(actor)?;
                self.resolve_entry(actor, &entry, &complaint, details).await
            }
            Outcome::RequireAction => {
                require_decide(actor)?;
                self.hand_back(actor, &entry, &complaint, details).await
            }
            Outcome::EscalateToNextRole => {
                let next = actor.role.next_role().ok_or_else(|| {
                    WorkflowError::RoutingUnavailable(format!(
                        "{} has no higher role to escalate to",
                        actor.role
                    ))
                })?;
                let route = self
                    .structural_route(next, entry.department.as_deref())
                    .await?
                    .ok_or_else(|| no_holder(next, entry.department.as_deref()))
                    .map_err(WorkflowError::RoutingUnavailable)?;
                self.escalate_entry(actor, &entry, &complaint, route, details)
                    .await
            }
        }
    }

    async fn try_escalate(
        &self,
        actor: Actor,
        request: EscalationRequest,
    ) -> WorkflowResult<AppliedTransition> {
        let reason = validation::details_text(&request.reason)?;
        let entry = self.addressed_entry(actor, request.entry_id).await?;
        if entry.complaint_id != request.complaint_id {
            return Err(WorkflowError::InvalidInput(format!(
                "escalation {} does not belong to complaint {}",
                entry.id, request.complaint_id
            )));
        }
        if !actor.role.can_escalate_to(request.target_role) {
            return Err(WorkflowError::NotAuthorized(format!(
                "{} cannot escalate to {}",
                actor.role, request.target_role
            )));
        }
        let complaint = self.complaint(entry.complaint_id).await?;

        let route = match request.target {
            RouteTarget::User(user_id) => {
                self.explicit_route(user_id, request.target_role, entry.department.clone())
                    .await?
            }
            RouteTarget::Department(department) => {
                let department = validation::department_hint(department.as_deref())
                    .or_else(|| entry.department.clone());
                self.structural_route(request.target_role, department.as_deref())
                    .await?
                    .ok_or_else(|| no_holder(request.target_role, department.as_deref()))
                    .map_err(WorkflowError::RoutingUnavailable)?
            }
        };
        if route.user_id == actor.id {
            return Err(WorkflowError::InvalidInput(
                "a complaint cannot be escalated to its current holder".to_string(),
            ));
        }

        self.escalate_entry(actor, &entry, &complaint, route, reason)
            .await
    }

    async fn try_assign(
        &self,
        actor: Actor,
        complaint_id: Uuid,
        target_role: UserRole,
        target_department: Option<&str>,
    ) -> WorkflowResult<AppliedTransition> {
        if !actor.role.can_assign_to(target_role) {
            return Err(WorkflowError::NotAuthorized(format!(
                "{} cannot assign to {}",
                actor.role, target_role
            )));
        }
        let complaint = self.complaint(complaint_id).await?;
        if complaint.status == ComplaintStatus::Resolved {
            return Err(WorkflowError::AlreadyProcessed(format!(
                "complaint {} is already resolved",
                complaint_id
            )));
        }

        let requested = validation::department_hint(target_department);
        let own_entry = self.store.pending_entry_for(complaint_id, actor.id).await?;
        let (original_handler, settle, department) = match own_entry {
            // Lateral re-routing supersedes the actor's own hop.
            Some(entry) => (
                entry.original_handler,
                Some(EntrySettlement {
                    entry_id: entry.id,
                    status: EscalationStatus::Forwarded,
                    resolution_details: Some(format!("Reassigned to {}", target_role.title())),
                }),
                requested.or(entry.department),
            ),
            None if actor.role == UserRole::Handler => {
                // Once routed, only the owning handler may route it again.
                let original_handler = match self.store.latest_entry(complaint_id).await? {
                    Some(latest) if latest.original_handler != actor.id => {
                        return Err(WorkflowError::NotAuthorized(format!(
                            "complaint {} is owned by another handler",
                            complaint_id
                        )))
                    }
                    Some(latest) => latest.original_handler,
                    None => actor.id,
                };
                let department = match requested {
                    Some(d) => Some(d),
                    None => self
                        .directory
                        .find_user(actor.id)
                        .await?
                        .and_then(|u| u.department),
                };
                (original_handler, None, department)
            }
            None => {
                return Err(WorkflowError::NotAuthorized(format!(
                    "complaint {} has no pending entry addressed to {}",
                    complaint_id, actor.id
                )))
            }
        };

        let route = self
            .structural_route(target_role, department.as_deref())
            .await?
            .ok_or_else(|| no_holder(target_role, department.as_deref()))
            .map_err(WorkflowError::NoRecipientConfigured)?;
        if route.user_id == actor.id {
            return Err(WorkflowError::InvalidInput(
                "a complaint cannot be assigned to its current holder".to_string(),
            ));
        }

        let mut transition = Transition::new(complaint.id, OffsetDateTime::now_utc());
        transition.guard.require_open = true;
        // A first hop must not open a second routing path.
        transition.guard.require_no_pending = settle.is_none();
        transition.settle = settle;
        transition.new_entry = Some(NewEscalation {
            complaint_id: complaint.id,
            escalated_by: actor.id,
            escalated_to_role: route.role,
            escalated_to: Some(route.user_id),
            department: route.department,
            action_type: ActionType::Assignment,
            original_handler,
        });
        transition.notifications =
            FanOut::assigned(complaint.id, &complaint.title, actor.role, route.user_id)
                .into_notifications();

        self.commit(transition).await
    }

    async fn try_resolve_first_line(
        &self,
        actor: Actor,
        complaint_id: Uuid,
        details: &str,
    ) -> WorkflowResult<AppliedTransition> {
        let details = validation::details_text(details)?;
        if !actor.role.capabilities().can_resolve_first_line {
            return Err(WorkflowError::NotAuthorized(format!(
                "{} cannot resolve complaints directly",
                actor.role
            )));
        }
        let complaint = self.complaint(complaint_id).await?;
        if complaint.status == ComplaintStatus::Resolved {
            return Err(WorkflowError::AlreadyProcessed(format!(
                "complaint {} is already resolved",
                complaint_id
            )));
        }

        let at = OffsetDateTime::now_utc();
        let filed = AuditReporter::new(self.directory.as_ref())
            .file_report(
                &complaint,
                actor,
                ReportType::Resolved,
                ComplaintStatus::Resolved,
                &details,
                at,
            )
            .await?;
        let people = Stakeholders {
            actor: actor.id,
            submitter: complaint.submitted_by,
            original_handler: actor.id,
            prior_escalator: None,
        };

        let mut transition = Transition::new(complaint.id, at);
        transition.guard.require_open = true;
        transition.guard.require_no_pending = true;
        transition.complaint = Some(ComplaintUpdate {
            status: ComplaintStatus::Resolved,
            resolution_details: Some(details.clone()),
            resolved_at: Some(at),
        });
        transition.decision = Some(NewDecision {
            escalation_id: None,
            complaint_id: complaint.id,
            sender_id: actor.id,
            receiver_id: None,
            decision_text: details.clone(),
            status: DecisionStatus::Final,
        });
        transition.notifications =
            FanOut::resolved(complaint.id, &complaint.title, actor.role, &people, &details)
                .into_notifications();
        transition.notifications.push(filed.notification);
        transition.report = Some(filed.report);

        self.commit(transition).await
    }

    async fn resolve_entry(
        &self,
        actor: Actor,
        entry: &EscalationEntry,
        complaint: &Complaint,
        details: String,
    ) -> WorkflowResult<AppliedTransition> {
        let at = OffsetDateTime::now_utc();
        let filed = AuditReporter::new(self.directory.as_ref())
            .file_report(
                complaint,
                actor,
                ReportType::Resolved,
                ComplaintStatus::Resolved,
                &details,
                at,
            )
            .await?;
        let people = stakeholders(actor, complaint, entry);

        let mut transition = Transition::new(complaint.id, at);
        transition.guard.require_open = true;
        transition.settle = Some(EntrySettlement {
            entry_id: entry.id,
            status: EscalationStatus::Resolved,
            resolution_details: Some(details.clone()),
        });
        transition.complaint = Some(ComplaintUpdate {
            status: ComplaintStatus::Resolved,
            resolution_details: Some(details.clone()),
            resolved_at: Some(at),
        });
        transition.decision = Some(NewDecision {
            escalation_id: Some(entry.id),
            complaint_id: complaint.id,
            sender_id: actor.id,
            receiver_id: None,
            decision_text: details.clone(),
            status: DecisionStatus::Final,
        });
        transition.notifications =
            FanOut::resolved(complaint.id, &complaint.title, actor.role, &people, &details)
                .into_notifications();
        transition.notifications.push(filed.notification);
        transition.report = Some(filed.report);

        self.commit(transition).await
    }

    async fn escalate_entry(
        &self,
        actor: Actor,
        entry: &EscalationEntry,
        complaint: &Complaint,
        route: Route,
        reason: String,
    ) -> WorkflowResult<AppliedTransition> {
        let at = OffsetDateTime::now_utc();
        let filed = AuditReporter::new(self.directory.as_ref())
            .file_report(
                complaint,
                actor,
                ReportType::Escalated,
                ComplaintStatus::Escalated,
                &reason,
                at,
            )
            .await?;
        let people = stakeholders(actor, complaint, entry);

        let mut transition = Transition::new(complaint.id, at);
        transition.guard.require_open = true;
        transition.settle = Some(EntrySettlement {
            entry_id: entry.id,
            status: route.settles_as,
            resolution_details: Some(reason.clone()),
        });
        transition.new_entry = Some(NewEscalation {
            complaint_id: complaint.id,
            escalated_by: actor.id,
            escalated_to_role: route.role,
            escalated_to: Some(route.user_id),
            department: route.department.clone(),
            action_type: ActionType::Escalation,
            original_handler: entry.original_handler,
        });
        transition.complaint = Some(ComplaintUpdate {
            status: ComplaintStatus::Escalated,
            resolution_details: None,
            resolved_at: None,
        });
        transition.notifications = FanOut::escalated(
            complaint.id,
            &complaint.title,
            actor.role,
            (route.user_id, route.role),
            &people,
            &reason,
        )
        .into_notifications();
        transition.notifications.push(filed.notification);
        transition.report = Some(filed.report);

        self.commit(transition).await
    }

    /// `action_required` hand-back: closes the current hop and reopens the
    /// complaint for its original handler without creating a new hop.
    async fn hand_back(
        &self,
        actor: Actor,
        entry: &EscalationEntry,
        complaint: &Complaint,
        details: String,
    ) -> WorkflowResult<AppliedTransition> {
        let people = stakeholders(actor, complaint, entry);

        let mut transition = Transition::new(complaint.id, OffsetDateTime::now_utc());
        transition.guard.require_open = true;
        transition.settle = Some(EntrySettlement {
            entry_id: entry.id,
            status: EscalationStatus::Resolved,
            resolution_details: Some(details.clone()),
        });
        transition.complaint = Some(ComplaintUpdate {
            status: ComplaintStatus::InProgress,
            resolution_details: None,
            resolved_at: None,
        });
        transition.decision = Some(NewDecision {
            escalation_id: Some(entry.id),
            complaint_id: complaint.id,
            sender_id: actor.id,
            receiver_id: Some(entry.original_handler),
            decision_text: details.clone(),
            status: DecisionStatus::ActionRequired,
        });
        transition.notifications =
            FanOut::action_required(complaint.id, &complaint.title, actor.role, &people, &details)
                .into_notifications();

        self.commit(transition).await
    }

    /// Loads an entry the actor may act on. Unknown entries are reported as
    /// not addressed to the actor.
    async fn addressed_entry(&self, actor: Actor, entry_id: Uuid) -> WorkflowResult<EscalationEntry> {
        let entry = self.store.get_entry(entry_id).await?.ok_or_else(|| {
            WorkflowError::NotAuthorized(format!(
                "escalation {} is not addressed to {}",
                entry_id, actor.id
            ))
        })?;
        let role_holder = match entry.escalated_to {
            Some(_) => None,
            None => {
                let department = entry
                    .department
                    .as_deref()
                    .filter(|_| entry.escalated_to_role.is_department_scoped());
                self.directory
                    .resolve_user(entry.escalated_to_role, department)
                    .await?
            }
        };
        validation::authorize_entry(&entry, &actor, role_holder)?;
        Ok(entry)
    }

    async fn complaint(&self, complaint_id: Uuid) -> WorkflowResult<Complaint> {
        self.store
            .get_complaint(complaint_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("complaint {}", complaint_id)))
    }

    /// Directory-resolved next hop. The department hint is carried forward on
    /// the new entry but only filters department-scoped roles.
    async fn structural_route(
        &self,
        role: UserRole,
        department: Option<&str>,
    ) -> WorkflowResult<Option<Route>> {
        let (user_id, settles_as) = if role.is_top_authority() {
            (
                self.directory.resolve_top_authority().await?,
                EscalationStatus::Forwarded,
            )
        } else {
            let scope = department.filter(|_| role.is_department_scoped());
            (
                self.directory.resolve_user(role, scope).await?,
                EscalationStatus::Escalated,
            )
        };
        Ok(user_id.map(|user_id| Route {
            user_id,
            role,
            department: department.map(str::to_string),
            settles_as,
        }))
    }

    async fn explicit_route(
        &self,
        user_id: Uuid,
        role: UserRole,
        department: Option<String>,
    ) -> WorkflowResult<Route> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                WorkflowError::InvalidInput(format!("user {} is not an active directory member", user_id))
            })?;
        if user.role != role {
            return Err(WorkflowError::InvalidInput(format!(
                "user {} does not hold the {} role",
                user_id, role
            )));
        }
        Ok(Route {
            user_id,
            role,
            department: department.or(user.department),
            settles_as: EscalationStatus::Forwarded,
        })
    }

    async fn commit(&self, transition: Transition) -> WorkflowResult<AppliedTransition> {
        self.store
            .apply(transition)
            .await
            .map_err(WorkflowError::from_apply)
    }

    fn finish(
        &self,
        operation: &'static str,
        actor: Actor,
        result: WorkflowResult<AppliedTransition>,
    ) -> WorkflowResult<AppliedTransition> {
        match &result {
            Ok(applied) => {
                info!(
                    operation,
                    actor = %actor.id,
                    role = %actor.role,
                    complaint_id = %applied.complaint.id,
                    status = applied.complaint.status.as_str(),
                    notifications = applied.notifications.len(),
                    report = applied.report.is_some(),
                    "Workflow transition committed"
                );
                self.dispatch_mail(&applied.notifications);
            }
            Err(err) => log_failure(operation, actor.id, err),
        }
        result
    }

    /// Outside the transaction: failures are logged and otherwise ignored.
    fn dispatch_mail(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        let mailer = Arc::clone(&self.mailer);
        let notifications = notifications.to_vec();
        tokio::spawn(async move {
            for notification in &notifications {
                if let Err(e) = mailer.deliver(notification).await {
                    warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "Best-effort email delivery failed"
                    );
                }
            }
        });
    }
}

fn stakeholders(actor: Actor, complaint: &Complaint, entry: &EscalationEntry) -> Stakeholders {
    Stakeholders {
        actor: actor.id,
        submitter: complaint.submitted_by,
        original_handler: entry.original_handler,
        prior_escalator: Some(entry.escalated_by),
    }
}

fn require_decide(actor: Actor) -> WorkflowResult<()> {
    if actor.role.capabilities().can_decide {
        Ok(())
    } else {
        Err(WorkflowError::NotAuthorized(format!(
            "{} cannot decide on escalations",
            actor.role
        )))
    }
}

fn no_holder(role: UserRole, department: Option<&str>) -> String {
    match department.filter(|_| role.is_department_scoped()) {
        Some(department) => format!("no active {} configured for department {}", role, department),
        None => format!("no active {} configured", role),
    }
}

fn observe<T>(operation: &'static str, subject: Uuid, result: WorkflowResult<T>) -> WorkflowResult<T> {
    if let Err(err) = &result {
        log_failure(operation, subject, err);
    }
    result
}

fn log_failure(operation: &'static str, subject: Uuid, err: &WorkflowError) {
    match err {
        WorkflowError::StorageFailure(cause) => error!(
            operation,
            subject = %subject,
            error = %cause,
            "Workflow storage failure; nothing was committed"
        ),
        _ => warn!(
            operation,
            subject = %subject,
            code = err.code(),
            error = %err,
            "Workflow action rejected"
        ),
    }
}
