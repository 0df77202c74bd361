use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{
    app_state::AppState, middleware::tracing::observability_middleware,
    modules::workflow::routes::workflow_routes,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", workflow_routes(state.clone()))
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let (status, db_status) = match state.engine.store().ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();

    (
        status,
        Json(json!({
            "status": if status.is_success() { "ok" } else { "degraded" },
            "timestamp": timestamp,
            "version": env!("CARGO_PKG_VERSION"),
            "services": {
                "database": db_status,
            }
        })),
    )
}
