use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{AppliedTransition, EscalationEntry, Notification, StereotypedReport, UserRole};
use crate::error::AppResult;
use crate::workflow::{Actor, EscalationRequest, History, Outcome, RouteTarget};

#[derive(Debug, Deserialize)]
pub struct DecideBody {
    pub outcome: Outcome,
    pub details: String,
}

#[derive(Debug, Deserialize)]
pub struct EscalateBody {
    pub entry_id: Uuid,
    pub target_role: UserRole,
    /// Takes precedence over `department` when both are given.
    pub target_user_id: Option<Uuid>,
    pub department: Option<String>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub target_role: UserRole,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub details: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_pending(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<Vec<EscalationEntry>>> {
    Ok(Json(state.engine.list_pending_for(actor.id).await?))
}

pub async fn decide(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<DecideBody>,
) -> AppResult<Json<AppliedTransition>> {
    let applied = state
        .engine
        .decide(actor, entry_id, body.outcome, &body.details)
        .await?;
    Ok(Json(applied))
}

pub async fn escalate(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<EscalateBody>,
) -> AppResult<Json<AppliedTransition>> {
    let target = match body.target_user_id {
        Some(user_id) => RouteTarget::User(user_id),
        None => RouteTarget::Department(body.department),
    };
    let request = EscalationRequest {
        complaint_id,
        entry_id: body.entry_id,
        target_role: body.target_role,
        target,
        reason: body.reason,
    };
    Ok(Json(state.engine.escalate(actor, request).await?))
}

pub async fn assign(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<AssignBody>,
) -> AppResult<Json<AppliedTransition>> {
    let applied = state
        .engine
        .assign(actor, complaint_id, body.target_role, body.department.as_deref())
        .await?;
    Ok(Json(applied))
}

pub async fn resolve(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<ResolveBody>,
) -> AppResult<Json<AppliedTransition>> {
    let applied = state
        .engine
        .resolve_first_line(actor, complaint_id, &body.details)
        .await?;
    Ok(Json(applied))
}

pub async fn history(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
) -> AppResult<Json<History>> {
    Ok(Json(state.engine.get_history(complaint_id).await?))
}

pub async fn notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let rows = state
        .engine
        .notifications_for(actor.id, query.unread_only)
        .await?;
    Ok(Json(rows))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    Ok(Json(
        state
            .engine
            .mark_notification_read(actor, notification_id)
            .await?,
    ))
}

pub async fn reports(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> AppResult<Json<Vec<StereotypedReport>>> {
    Ok(Json(state.engine.reports_for(actor).await?))
}
