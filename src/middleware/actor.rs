use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::config::WorkflowConfig;
use crate::db::UserRole;
use crate::error::AppError;
use crate::workflow::Actor;

/// Reads the acting user from the trusted gateway headers and stores it in
/// the request extensions. Requests without a valid identity get a 401.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match actor_from_headers(request.headers(), &state.env.workflow) {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn actor_from_headers(headers: &HeaderMap, config: &WorkflowConfig) -> Result<Actor, AppError> {
    let id = header(headers, &config.actor_id_header)?
        .parse::<Uuid>()
        .map_err(|_| AppError::Authentication(format!("{} is not a valid user id", config.actor_id_header)))?;
    let role = header(headers, &config.actor_role_header)?
        .parse::<UserRole>()
        .map_err(AppError::Authentication)?;
    Ok(Actor::new(id, role))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Authentication(format!("missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-actor-id", HeaderValue::from_str(id).unwrap());
        headers.insert("x-actor-role", HeaderValue::from_str(role).unwrap());
        headers
    }

    #[test]
    fn parses_identity_headers() {
        let id = Uuid::from_u128(7);
        let actor =
            actor_from_headers(&headers(&id.to_string(), "College_Dean"), &WorkflowConfig::default())
                .unwrap();
        assert_eq!(actor, Actor::new(id, UserRole::CollegeDean));
    }

    #[test]
    fn rejects_missing_or_malformed_identity() {
        let config = WorkflowConfig::default();
        assert!(matches!(
            actor_from_headers(&HeaderMap::new(), &config),
            Err(AppError::Authentication(_))
        ));
        assert!(actor_from_headers(&headers("not-a-uuid", "handler"), &config).is_err());
        assert!(actor_from_headers(&headers(&Uuid::from_u128(7).to_string(), "janitor"), &config).is_err());
    }
}
