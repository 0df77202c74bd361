mod complaint_repository;
mod decision_repository;
mod escalation_repository;
mod notification_repository;
mod report_repository;
mod user_repository;

pub use complaint_repository::ComplaintRepository;
pub use decision_repository::DecisionRepository;
pub use escalation_repository::EscalationRepository;
pub use notification_repository::NotificationRepository;
pub use report_repository::ReportRepository;
pub use user_repository::UserRepository;
