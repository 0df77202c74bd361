use sqlx::{Error, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{NewReport, StereotypedReport};

const REPORT_COLUMNS: &str =
    "id, complaint_id, sender_id, recipient_id, report_type, body, created_at";

pub struct ReportRepository;

impl ReportRepository {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        report: &NewReport,
        at: OffsetDateTime,
    ) -> Result<StereotypedReport, Error> {
        sqlx::query_as::<_, StereotypedReport>(&format!(
            r#"
            INSERT INTO stereotyped_reports (id, complaint_id, sender_id, recipient_id, report_type, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(report.complaint_id)
        .bind(report.sender_id)
        .bind(report.recipient_id)
        .bind(report.report_type)
        .bind(&report.body)
        .bind(at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
    ) -> Result<Vec<StereotypedReport>, Error> {
        sqlx::query_as::<_, StereotypedReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM stereotyped_reports WHERE recipient_id = $1 ORDER BY created_at, id"
        ))
        .bind(recipient_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_complaint(
        pool: &PgPool,
        complaint_id: Uuid,
    ) -> Result<Vec<StereotypedReport>, Error> {
        sqlx::query_as::<_, StereotypedReport>(&format!(
            "SELECT {REPORT_COLUMNS} FROM stereotyped_reports WHERE complaint_id = $1 ORDER BY created_at, id"
        ))
        .bind(complaint_id)
        .fetch_all(pool)
        .await
    }
}
