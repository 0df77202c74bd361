use sqlx::{Error, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{Complaint, ComplaintUpdate, NewComplaint};

const COMPLAINT_COLUMNS: &str = "id, title, description, category, visibility, status, \
    resolution_details, resolved_at, submitted_by, created_at, updated_at";

pub struct ComplaintRepository;

impl ComplaintRepository {
    pub async fn create(pool: &PgPool, complaint: &NewComplaint) -> Result<Complaint, Error> {
        sqlx::query_as::<_, Complaint>(&format!(
            r#"
            INSERT INTO complaints (id, title, description, category, visibility, status, submitted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMPLAINT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(&complaint.title)
        .bind(&complaint.description)
        .bind(&complaint.category)
        .bind(complaint.visibility)
        .bind(complaint.status)
        .bind(complaint.submitted_by)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &PgPool, complaint_id: Uuid) -> Result<Option<Complaint>, Error> {
        sqlx::query_as::<_, Complaint>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1"
        ))
        .bind(complaint_id)
        .fetch_optional(pool)
        .await
    }

    /// Row-locks the complaint for the rest of the transaction. Every workflow
    /// transition takes this lock first, so transitions on one complaint
    /// serialize.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        complaint_id: Uuid,
    ) -> Result<Option<Complaint>, Error> {
        sqlx::query_as::<_, Complaint>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1 FOR UPDATE"
        ))
        .bind(complaint_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn apply_update(
        tx: &mut Transaction<'_, Postgres>,
        complaint_id: Uuid,
        update: &ComplaintUpdate,
        at: OffsetDateTime,
    ) -> Result<Complaint, Error> {
        sqlx::query_as::<_, Complaint>(&format!(
            r#"
            UPDATE complaints
            SET
                status = $1,
                resolution_details = $2,
                resolved_at = $3,
                updated_at = $4
            WHERE id = $5
            RETURNING {COMPLAINT_COLUMNS}
            "#
        ))
        .bind(update.status)
        .bind(&update.resolution_details)
        .bind(update.resolved_at)
        .bind(at)
        .bind(complaint_id)
        .fetch_one(&mut **tx)
        .await
    }
}
