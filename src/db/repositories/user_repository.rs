use sqlx::{Error, PgPool};
use uuid::Uuid;

use crate::db::models::{User, UserRole};

pub struct UserRepository;

impl UserRepository {
    pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, role, department, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lowest-id active holder of the role, optionally scoped to a department.
    pub async fn resolve_role_holder(
        pool: &PgPool,
        role: UserRole,
        department: Option<&str>,
    ) -> Result<Option<Uuid>, Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM users
            WHERE role = $1
              AND is_active
              AND ($2::TEXT IS NULL OR department = $2)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(role)
        .bind(department)
        .fetch_optional(pool)
        .await
    }
}
