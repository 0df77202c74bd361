mod complaint;
mod decision;
mod escalation;
mod notification;
mod report;
mod user;

pub use complaint::*;
pub use decision::*;
pub use escalation::*;
pub use notification::*;
pub use report::*;
pub use user::*;
