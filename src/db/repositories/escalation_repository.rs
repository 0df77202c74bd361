use sqlx::{Error, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{EntrySettlement, EscalationEntry, NewEscalation};

const ENTRY_COLUMNS: &str = "id, complaint_id, escalated_by, escalated_to_role, escalated_to, \
    department, action_type, status, original_handler, resolution_details, created_at, resolved_at";

pub struct EscalationRepository;

impl EscalationRepository {
    pub async fn get_by_id(pool: &PgPool, entry_id: Uuid) -> Result<Option<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM escalations WHERE id = $1"
        ))
        .bind(entry_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn latest_for_complaint(
        pool: &PgPool,
        complaint_id: Uuid,
    ) -> Result<Option<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM escalations
            WHERE complaint_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(complaint_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn pending_for(
        pool: &PgPool,
        complaint_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM escalations
            WHERE complaint_id = $1 AND escalated_to = $2 AND status = 'pending'
            "#
        ))
        .bind(complaint_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_pending_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM escalations
            WHERE escalated_to = $1 AND status = 'pending'
            ORDER BY created_at, id
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_complaint(
        pool: &PgPool,
        complaint_id: Uuid,
    ) -> Result<Vec<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM escalations WHERE complaint_id = $1 ORDER BY created_at, id"
        ))
        .bind(complaint_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_pending(
        tx: &mut Transaction<'_, Postgres>,
        complaint_id: Uuid,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM escalations WHERE complaint_id = $1 AND status = 'pending'",
        )
        .bind(complaint_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewEscalation,
        at: OffsetDateTime,
    ) -> Result<EscalationEntry, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            r#"
            INSERT INTO escalations
                (id, complaint_id, escalated_by, escalated_to_role, escalated_to, department,
                 action_type, status, original_handler, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(entry.complaint_id)
        .bind(entry.escalated_by)
        .bind(entry.escalated_to_role)
        .bind(entry.escalated_to)
        .bind(&entry.department)
        .bind(entry.action_type)
        .bind(entry.original_handler)
        .bind(at)
        .fetch_one(&mut **tx)
        .await
    }

    /// Flips a pending entry to its terminal status. Returns `None` when the
    /// entry is no longer pending; a concurrent settle blocks on the row lock
    /// and then sees the new status.
    pub async fn settle(
        tx: &mut Transaction<'_, Postgres>,
        settlement: &EntrySettlement,
        at: OffsetDateTime,
    ) -> Result<Option<EscalationEntry>, Error> {
        sqlx::query_as::<_, EscalationEntry>(&format!(
            r#"
            UPDATE escalations
            SET status = $1, resolution_details = $2, resolved_at = $3
            WHERE id = $4 AND status = 'pending'
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(settlement.status)
        .bind(&settlement.resolution_details)
        .bind(at)
        .bind(settlement.entry_id)
        .fetch_optional(&mut **tx)
        .await
    }
}
