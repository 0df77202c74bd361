//! Stereotyped reports for the top authority.
//!
//! A report body is rendered once from a frozen read of the complaint and the
//! acting user, so later edits never rewrite history.

use std::fmt::Write as _;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use super::directory::Directory;
use super::error::{WorkflowError, WorkflowResult};
use super::Actor;
use crate::db::{
    Complaint, ComplaintStatus, ComplaintVisibility, NewNotification, NewReport, NotificationType,
    ReportType,
};

/// Snapshot rendered into a report body.
#[derive(Debug, Clone)]
pub struct ReportSnapshot<'a> {
    pub complaint: &'a Complaint,
    pub status_after: ComplaintStatus,
    pub sender: Actor,
    pub sender_name: Option<&'a str>,
    pub submitter_name: Option<&'a str>,
    pub report_type: ReportType,
    pub additional_info: &'a str,
    pub at: OffsetDateTime,
}

/// A report ready to be written, with its companion notification.
#[derive(Debug, Clone)]
pub struct FiledReport {
    pub report: NewReport,
    pub notification: NewNotification,
}

fn timestamp(at: OffsetDateTime) -> WorkflowResult<String> {
    at.format(&Rfc3339)
        .map_err(|e| WorkflowError::InvalidInput(format!("unformattable timestamp: {}", e)))
}

pub fn render_report(snapshot: &ReportSnapshot<'_>) -> WorkflowResult<String> {
    let complaint = snapshot.complaint;
    let submitter = match (complaint.visibility, snapshot.submitter_name) {
        (ComplaintVisibility::Anonymous, _) => "Anonymous".to_string(),
        (_, Some(name)) => format!("{} ({})", name, complaint.submitted_by),
        (_, None) => complaint.submitted_by.to_string(),
    };
    let sender = match snapshot.sender_name {
        Some(name) => format!("{} ({}, {})", name, snapshot.sender.role.title(), snapshot.sender.id),
        None => format!("{} ({})", snapshot.sender.id, snapshot.sender.role.title()),
    };

    let mut body = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(body, "COMPLAINT {} REPORT", snapshot.report_type.as_str().to_uppercase());
    let _ = writeln!(body, "Complaint ID: {}", complaint.id);
    let _ = writeln!(body, "Title: {}", complaint.title);
    let _ = writeln!(body, "Category: {}", complaint.category.as_deref().unwrap_or("Uncategorized"));
    let _ = writeln!(body, "Status: {}", snapshot.status_after.as_str());
    let _ = writeln!(body, "Submitted By: {}", submitter);
    let _ = writeln!(body, "Submitted At: {}", timestamp(complaint.created_at)?);
    let _ = writeln!(body, "Action By: {}", sender);
    let _ = writeln!(body, "Action Date: {}", timestamp(snapshot.at)?);
    let _ = writeln!(body);
    let _ = writeln!(body, "Description:");
    let _ = writeln!(body, "{}", complaint.description);
    let _ = writeln!(body);
    let _ = writeln!(body, "Additional Information:");
    let _ = write!(body, "{}", snapshot.additional_info);
    Ok(body)
}

pub struct AuditReporter<'a> {
    directory: &'a dyn Directory,
}

impl<'a> AuditReporter<'a> {
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// Renders a report addressed to the top authority. Fails with
    /// `RoutingUnavailable` when no top authority is configured; the caller
    /// must abort the whole transition in that case.
    pub async fn file_report(
        &self,
        complaint: &Complaint,
        sender: Actor,
        report_type: ReportType,
        status_after: ComplaintStatus,
        additional_info: &str,
        at: OffsetDateTime,
    ) -> WorkflowResult<FiledReport> {
        let recipient = self.directory.resolve_top_authority().await?.ok_or_else(|| {
            WorkflowError::RoutingUnavailable(
                "no top authority configured to receive the audit report".to_string(),
            )
        })?;

        let sender_user = self.directory.find_user(sender.id).await?;
        let submitter_user = self.directory.find_user(complaint.submitted_by).await?;
        let body = render_report(&ReportSnapshot {
            complaint,
            status_after,
            sender,
            sender_name: sender_user.as_ref().map(|u| u.full_name.as_str()),
            submitter_name: submitter_user.as_ref().map(|u| u.full_name.as_str()),
            report_type,
            additional_info,
            at,
        })?;

        Ok(FiledReport {
            report: NewReport {
                complaint_id: complaint.id,
                sender_id: sender.id,
                recipient_id: recipient,
                report_type,
                body,
            },
            notification: companion_notification(recipient, complaint, report_type),
        })
    }
}

fn companion_notification(
    recipient: Uuid,
    complaint: &Complaint,
    report_type: ReportType,
) -> NewNotification {
    NewNotification {
        user_id: recipient,
        complaint_id: Some(complaint.id),
        notification_type: NotificationType::ReportFiled,
        description: format!(
            "A {} report for complaint \"{}\" has been filed for your review.",
            report_type.as_str(),
            complaint.title
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserRole;
    use time::macros::datetime;

    fn complaint(visibility: ComplaintVisibility) -> Complaint {
        Complaint {
            id: Uuid::from_u128(42),
            title: "Unfair grading".to_string(),
            description: "Midterm grades were not published".to_string(),
            category: Some("Academic".to_string()),
            visibility,
            status: ComplaintStatus::InProgress,
            resolution_details: None,
            resolved_at: None,
            submitted_by: Uuid::from_u128(1),
            created_at: datetime!(2026-10-01 09:00 UTC),
            updated_at: datetime!(2026-10-01 09:00 UTC),
        }
    }

    fn snapshot<'a>(complaint: &'a Complaint, info: &'a str) -> ReportSnapshot<'a> {
        ReportSnapshot {
            complaint,
            status_after: ComplaintStatus::Resolved,
            sender: Actor::new(Uuid::from_u128(20), UserRole::DepartmentHead),
            sender_name: Some("Dana Head"),
            submitter_name: Some("Sam Student"),
            report_type: ReportType::Resolved,
            additional_info: info,
            at: datetime!(2026-10-02 14:30 UTC),
        }
    }

    #[test]
    fn renders_fixed_layout() {
        let c = complaint(ComplaintVisibility::Public);
        let body = render_report(&snapshot(&c, "Issue addressed by policy change.")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "COMPLAINT RESOLVED REPORT");
        assert_eq!(lines[1], format!("Complaint ID: {}", Uuid::from_u128(42)));
        assert_eq!(lines[3], "Category: Academic");
        assert_eq!(lines[4], "Status: resolved");
        assert_eq!(lines[6], "Submitted At: 2026-10-01T09:00:00Z");
        assert!(lines[7].starts_with("Action By: Dana Head (Department Head"));
        assert_eq!(lines[8], "Action Date: 2026-10-02T14:30:00Z");
        assert_eq!(*lines.last().unwrap(), "Issue addressed by policy change.");
    }

    #[test]
    fn rendering_is_deterministic_and_hides_anonymous_submitters() {
        let c = complaint(ComplaintVisibility::Anonymous);
        let first = render_report(&snapshot(&c, "Resolved after review.")).unwrap();
        let second = render_report(&snapshot(&c, "Resolved after review.")).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("Submitted By: Anonymous"));
        assert!(!first.contains("Sam Student"));
    }
}
