use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use complaint_workflow::{
    app::create_router,
    app_state::AppState,
    config::{AppConfig, Config, DatabaseConfig, Environment, ServerConfig, WorkflowConfig},
    db::{
        Complaint, ComplaintStatus, ComplaintStore, ComplaintVisibility, MemoryWorkflowStore,
        NewComplaint, UserRole,
    },
    workflow::{StaticDirectory, WorkflowEngine},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn config() -> Config {
    Config {
        server: ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: None,
            min_connections: None,
        },
        workflow: WorkflowConfig::default(),
        app: AppConfig {
            name: "Complaint Workflow".to_string(),
            environment: Environment::Development,
        },
    }
}

async fn app() -> (Router, Complaint) {
    let store = Arc::new(MemoryWorkflowStore::new());
    let complaint = store
        .create_complaint(NewComplaint {
            title: "Library closes early".to_string(),
            description: "The library closes at 6pm during exam week.".to_string(),
            category: None,
            visibility: ComplaintVisibility::Anonymous,
            status: ComplaintStatus::InProgress,
            submitted_by: Uuid::from_u128(1),
        })
        .await
        .unwrap();
    let directory = StaticDirectory::new()
        .member(Uuid::from_u128(10), "Hana Handler", UserRole::Handler, Some("CS"))
        .member(Uuid::from_u128(20), "Dana Head", UserRole::DepartmentHead, Some("CS"))
        .member(Uuid::from_u128(60), "Pat President", UserRole::President, None);
    let engine = WorkflowEngine::new(store, Arc::new(directory));
    let state = AppState::new(config(), Arc::new(engine));
    (create_router(state), complaint)
}

fn request(method: &str, uri: &str, actor: Option<(u128, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder
            .header("x-actor-id", Uuid::from_u128(id).to_string())
            .header("x-actor-role", role);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_database_status() {
    let (app, _) = app().await;
    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["services"]["database"], "healthy");
}

#[tokio::test]
async fn api_requires_identity_headers() {
    let (app, _) = app().await;
    let response = app
        .oneshot(request("GET", "/api/escalations/pending", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "authentication_failed");
}

#[tokio::test]
async fn assign_then_decide_over_http() {
    let (app, complaint) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/complaints/{}/assign", complaint.id),
            Some((10, "handler")),
            Some(json!({ "target_role": "department_head", "department": "CS" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assigned = json_body(response).await;
    let entry_id = assigned["entry"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/escalations/{}/decide", entry_id),
            Some((20, "department_head")),
            Some(json!({ "outcome": "resolve", "details": "Opening hours extended to 10pm." })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let decided = json_body(response).await;
    assert_eq!(decided["complaint"]["status"], "resolved");
    assert_eq!(decided["decision"]["status"], "final");

    // A second decision on the same entry conflicts.
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/escalations/{}/decide", entry_id),
            Some((20, "department_head")),
            Some(json!({ "outcome": "resolve", "details": "Opening hours extended to 10pm." })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], "already_processed");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/reports", Some((60, "president")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reports = json_body(response).await;
    let body = reports[0]["body"].as_str().unwrap();
    assert!(body.contains("Submitted By: Anonymous"));

    let response = app
        .oneshot(request("GET", "/api/reports", Some((20, "department_head")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn short_details_are_rejected() {
    let (app, complaint) = app().await;
    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/complaints/{}/resolve", complaint.id),
            Some((10, "handler")),
            Some(json!({ "details": "done" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "invalid_input");
}
