//! Notification fan-out.
//!
//! Each transition type has a fixed recipient list computed from entities the
//! engine has already loaded. Rows are only collected here; they are written
//! by the same transition that changes the ledger.

use uuid::Uuid;

use crate::db::{NewNotification, NotificationType, UserRole};

/// People with a stake in one transition.
#[derive(Debug, Clone, Copy)]
pub struct Stakeholders {
    pub actor: Uuid,
    pub submitter: Uuid,
    pub original_handler: Uuid,
    /// Whoever routed the current entry to the actor.
    pub prior_escalator: Option<Uuid>,
}

impl Stakeholders {
    /// The prior escalator only gets a separate notification when they are
    /// not already covered by another slot.
    fn distinct_escalator(&self, recipient: Option<Uuid>) -> Option<Uuid> {
        self.prior_escalator.filter(|escalator| {
            *escalator != self.original_handler
                && *escalator != self.actor
                && Some(*escalator) != recipient
        })
    }
}

#[derive(Debug)]
pub struct FanOut {
    complaint_id: Uuid,
    notifications: Vec<NewNotification>,
}

impl FanOut {
    pub fn new(complaint_id: Uuid) -> Self {
        Self {
            complaint_id,
            notifications: Vec::new(),
        }
    }

    pub fn notify(
        &mut self,
        user_id: Uuid,
        notification_type: NotificationType,
        description: impl Into<String>,
    ) -> &mut Self {
        self.notifications.push(NewNotification {
            user_id,
            complaint_id: Some(self.complaint_id),
            notification_type,
            description: description.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn into_notifications(self) -> Vec<NewNotification> {
        self.notifications
    }

    /// Complaint closed by a decision on an entry.
    pub fn resolved(
        complaint_id: Uuid,
        title: &str,
        actor_role: UserRole,
        people: &Stakeholders,
        details: &str,
    ) -> Self {
        let kind = NotificationType::ComplaintResolved;
        let mut fan = Self::new(complaint_id);
        fan.notify(
            people.submitter,
            kind,
            format!("Your complaint \"{}\" has been resolved by the {}: {}", title, actor_role.title(), details),
        );
        if people.original_handler != people.actor {
            fan.notify(
                people.original_handler,
                kind,
                format!("Complaint \"{}\" you handled was resolved by the {}: {}", title, actor_role.title(), details),
            );
        }
        if let Some(escalator) = people.distinct_escalator(None) {
            fan.notify(
                escalator,
                kind,
                format!("Complaint \"{}\" you routed was resolved by the {}.", title, actor_role.title()),
            );
        }
        fan
    }

    /// Complaint moved up the hierarchy to `recipient`.
    pub fn escalated(
        complaint_id: Uuid,
        title: &str,
        actor_role: UserRole,
        recipient: (Uuid, UserRole),
        people: &Stakeholders,
        reason: &str,
    ) -> Self {
        let kind = NotificationType::ComplaintEscalated;
        let (recipient_id, recipient_role) = recipient;
        let mut fan = Self::new(complaint_id);
        fan.notify(
            recipient_id,
            kind,
            format!(
                "Complaint \"{}\" has been escalated to you by the {}. Reason: {}",
                title,
                actor_role.title(),
                reason
            ),
        );
        fan.notify(
            people.submitter,
            kind,
            format!("Your complaint \"{}\" has been escalated to the {}.", title, recipient_role.title()),
        );
        fan.notify(
            people.original_handler,
            kind,
            format!(
                "Complaint \"{}\" you handled was escalated by the {} to the {}.",
                title,
                actor_role.title(),
                recipient_role.title()
            ),
        );
        if let Some(escalator) = people.distinct_escalator(Some(recipient_id)) {
            fan.notify(
                escalator,
                kind,
                format!("Complaint \"{}\" you routed was escalated to the {}.", title, recipient_role.title()),
            );
        }
        fan
    }

    /// Decision handed back to the original handler for further action.
    pub fn action_required(
        complaint_id: Uuid,
        title: &str,
        actor_role: UserRole,
        people: &Stakeholders,
        details: &str,
    ) -> Self {
        let kind = NotificationType::ActionRequired;
        let mut fan = Self::new(complaint_id);
        fan.notify(
            people.original_handler,
            kind,
            format!(
                "The {} requires further action on complaint \"{}\": {}",
                actor_role.title(),
                title,
                details
            ),
        );
        fan.notify(
            people.submitter,
            kind,
            format!("Your complaint \"{}\" needs further action and is back in progress.", title),
        );
        if let Some(escalator) = people.distinct_escalator(None) {
            fan.notify(
                escalator,
                kind,
                format!("Complaint \"{}\" you routed was returned to its handler by the {}.", title, actor_role.title()),
            );
        }
        fan
    }

    /// New assignment; only the recipient is told.
    pub fn assigned(complaint_id: Uuid, title: &str, actor_role: UserRole, recipient: Uuid) -> Self {
        let mut fan = Self::new(complaint_id);
        fan.notify(
            recipient,
            NotificationType::ComplaintAssigned,
            format!("Complaint \"{}\" has been assigned to you by the {}.", title, actor_role.title()),
        );
        fan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people(prior_escalator: Option<u128>) -> Stakeholders {
        Stakeholders {
            actor: Uuid::from_u128(20),
            submitter: Uuid::from_u128(1),
            original_handler: Uuid::from_u128(10),
            prior_escalator: prior_escalator.map(Uuid::from_u128),
        }
    }

    fn recipients(fan: FanOut) -> Vec<Uuid> {
        fan.into_notifications().into_iter().map(|n| n.user_id).collect()
    }

    #[test]
    fn escalation_notifies_recipient_submitter_and_handler() {
        let fan = FanOut::escalated(
            Uuid::from_u128(42),
            "Grades",
            UserRole::DepartmentHead,
            (Uuid::from_u128(30), UserRole::CollegeDean),
            &people(Some(10)),
            "Needs dean authority",
        );
        assert_eq!(
            recipients(fan),
            vec![Uuid::from_u128(30), Uuid::from_u128(1), Uuid::from_u128(10)]
        );
    }

    #[test]
    fn distinct_prior_escalator_gets_its_own_row() {
        let fan = FanOut::escalated(
            Uuid::from_u128(42),
            "Grades",
            UserRole::CollegeDean,
            (Uuid::from_u128(40), UserRole::CampusRegistrar),
            &people(Some(21)),
            "Needs registrar",
        );
        assert_eq!(fan.len(), 4);

        let fan = FanOut::resolved(
            Uuid::from_u128(42),
            "Grades",
            UserRole::CollegeDean,
            &people(Some(21)),
            "Resolved by policy",
        );
        assert_eq!(
            recipients(fan),
            vec![Uuid::from_u128(1), Uuid::from_u128(10), Uuid::from_u128(21)]
        );
    }

    #[test]
    fn every_row_is_linked_to_the_complaint() {
        let fan = FanOut::action_required(
            Uuid::from_u128(42),
            "Grades",
            UserRole::DepartmentHead,
            &people(None),
            "Collect the lab logs first",
        );
        let rows = fan.into_notifications();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|n| n.complaint_id == Some(Uuid::from_u128(42))));
        assert!(rows.iter().all(|n| n.notification_type == NotificationType::ActionRequired));
    }
}
