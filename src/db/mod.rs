mod error;
pub mod memory;
mod models;
pub mod postgres;
mod repositories;
mod store;

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

pub use error::{DatabaseError, DbResult};
pub use memory::MemoryWorkflowStore;
pub use models::*;
pub use postgres::{PgDirectory, PgWorkflowStore};
pub use store::{
    AppliedTransition, ComplaintStore, DecisionLog, EscalationLedger, NotificationStore,
    ReportStore, Transition, TransitionGuard, TransitionStore, WorkflowStore,
};

/// Initialize the database connection pool and apply pending migrations.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections.unwrap_or(10))
        .min_connections(config.min_connections.unwrap_or(1))
        .connect(&config.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
