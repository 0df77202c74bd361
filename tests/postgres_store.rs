#![cfg(feature = "postgres-tests")]

use std::sync::Arc;

use complaint_workflow::db::{
    ComplaintStatus, ComplaintStore, ComplaintVisibility, DecisionStatus, NewComplaint,
    PgDirectory, PgWorkflowStore, UserRole,
};
use complaint_workflow::workflow::{Actor, Outcome, WorkflowEngine, WorkflowError};
use sqlx::PgPool;
use uuid::Uuid;

const SUBMITTER: u128 = 1;
const HANDLER: u128 = 10;
const OTHER_HANDLER: u128 = 11;
const HEAD: u128 = 20;
const PRESIDENT: u128 = 60;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

async fn seed_user(pool: &PgPool, n: u128, name: &str, role: UserRole, department: Option<&str>) {
    sqlx::query(
        "INSERT INTO users (id, full_name, email, role, department) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id(n))
    .bind(name)
    .bind(format!("user{}@example.edu", n))
    .bind(role)
    .bind(department)
    .execute(pool)
    .await
    .unwrap();
}

async fn engine(pool: &PgPool) -> Arc<WorkflowEngine> {
    seed_user(pool, HANDLER, "Hana Handler", UserRole::Handler, Some("CS")).await;
    seed_user(pool, OTHER_HANDLER, "Omar Handler", UserRole::Handler, Some("CS")).await;
    seed_user(pool, HEAD, "Dana Head", UserRole::DepartmentHead, Some("CS")).await;
    seed_user(pool, PRESIDENT, "Pat President", UserRole::President, None).await;
    Arc::new(WorkflowEngine::new(
        Arc::new(PgWorkflowStore::new(pool.clone())),
        Arc::new(PgDirectory::new(pool.clone())),
    ))
}

async fn submit(pool: &PgPool) -> Uuid {
    PgWorkflowStore::new(pool.clone())
        .create_complaint(NewComplaint {
            title: "Midterm grades missing".to_string(),
            description: "Grades for CS101 midterm were never published.".to_string(),
            category: Some("Academic".to_string()),
            visibility: ComplaintVisibility::Public,
            status: ComplaintStatus::InProgress,
            submitted_by: id(SUBMITTER),
        })
        .await
        .unwrap()
        .id
}

fn handler() -> Actor {
    Actor::new(id(HANDLER), UserRole::Handler)
}

fn head() -> Actor {
    Actor::new(id(HEAD), UserRole::DepartmentHead)
}

#[sqlx::test]
async fn racing_decisions_commit_once(pool: PgPool) {
    let engine = engine(&pool).await;
    let complaint_id = submit(&pool).await;
    let entry = engine
        .assign(handler(), complaint_id, UserRole::DepartmentHead, Some("CS"))
        .await
        .unwrap()
        .entry
        .unwrap();

    let spawn_decide = |details: &'static str| {
        let engine = Arc::clone(&engine);
        let entry_id = entry.id;
        tokio::spawn(async move { engine.decide(head(), entry_id, Outcome::Resolve, details).await })
    };
    let (first, second) = tokio::join!(
        spawn_decide("Resolved by the first click."),
        spawn_decide("Resolved by the second click.")
    );
    let results = [first.unwrap(), second.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(WorkflowError::AlreadyProcessed(_)))));

    let history = engine.get_history(complaint_id).await.unwrap();
    let finals = history
        .decisions
        .iter()
        .filter(|d| d.status == DecisionStatus::Final)
        .count();
    assert_eq!(finals, 1);
    assert_eq!(history.reports.len(), 1);
    assert_eq!(history.complaint.status, ComplaintStatus::Resolved);
    assert!(history.ledger_entries.iter().all(|e| !e.is_pending()));
}

#[sqlx::test]
async fn routed_complaint_rejects_a_second_first_hop(pool: PgPool) {
    let engine = engine(&pool).await;
    let complaint_id = submit(&pool).await;
    engine
        .assign(handler(), complaint_id, UserRole::DepartmentHead, Some("CS"))
        .await
        .unwrap();

    let other = engine
        .assign(
            Actor::new(id(OTHER_HANDLER), UserRole::Handler),
            complaint_id,
            UserRole::DepartmentHead,
            Some("CS"),
        )
        .await;
    assert!(matches!(other, Err(WorkflowError::NotAuthorized(_))));

    let again = engine
        .assign(handler(), complaint_id, UserRole::DepartmentHead, Some("CS"))
        .await;
    assert!(matches!(again, Err(WorkflowError::AlreadyProcessed(_))));

    let pending = engine.list_pending_for(id(HEAD)).await.unwrap();
    assert_eq!(pending.len(), 1);
}
