//! Complaint escalation workflow: routing, authorization, the escalation
//! ledger, notification fan-out and audit reports.

mod audit;
mod directory;
mod engine;
mod error;
mod fanout;
mod mailer;
mod roles;
mod validation;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::UserRole;

pub use audit::{render_report, AuditReporter, FiledReport, ReportSnapshot};
pub use directory::{Directory, StaticDirectory};
pub use engine::{EscalationRequest, History, Outcome, RouteTarget, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use fanout::{FanOut, Stakeholders};
pub use mailer::{MailError, Mailer, TracingMailer};
pub use roles::Capabilities;
pub use validation::{details_text, MAX_DETAILS_LEN, MIN_DETAILS_LEN};

/// The authenticated user performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }
}
