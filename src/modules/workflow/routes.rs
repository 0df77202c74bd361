use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{
    assign, decide, escalate, history, list_pending, mark_read, notifications, reports, resolve,
};
use crate::app_state::AppState;
use crate::middleware::actor::actor_middleware;

/// Workflow API. Every route requires the gateway identity headers.
pub fn workflow_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/escalations/pending", get(list_pending))
        .route("/escalations/:id/decide", post(decide))
        .route("/complaints/:id/escalate", post(escalate))
        .route("/complaints/:id/assign", post(assign))
        .route("/complaints/:id/resolve", post(resolve))
        .route("/complaints/:id/history", get(history))
        .route("/notifications", get(notifications))
        .route("/notifications/:id/read", post(mark_read))
        .route("/reports", get(reports))
        .route_layer(middleware::from_fn_with_state(state, actor_middleware))
}
