use sqlx::{Error, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{Decision, NewDecision};

pub struct DecisionRepository;

impl DecisionRepository {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        decision: &NewDecision,
        at: OffsetDateTime,
    ) -> Result<Decision, Error> {
        sqlx::query_as::<_, Decision>(
            r#"
            INSERT INTO decisions
                (id, escalation_id, complaint_id, sender_id, receiver_id, decision_text, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, escalation_id, complaint_id, sender_id, receiver_id, decision_text, status, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(decision.escalation_id)
        .bind(decision.complaint_id)
        .bind(decision.sender_id)
        .bind(decision.receiver_id)
        .bind(&decision.decision_text)
        .bind(decision.status)
        .bind(at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_for_complaint(pool: &PgPool, complaint_id: Uuid) -> Result<Vec<Decision>, Error> {
        sqlx::query_as::<_, Decision>(
            r#"
            SELECT id, escalation_id, complaint_id, sender_id, receiver_id, decision_text, status, created_at
            FROM decisions
            WHERE complaint_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(complaint_id)
        .fetch_all(pool)
        .await
    }
}
