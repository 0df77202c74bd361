use async_trait::async_trait;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{DbResult, User, UserRole};

/// Role membership lookups. Read-only to the workflow.
///
/// When several users match, implementations return the lowest id so routing
/// stays deterministic.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn resolve_user(&self, role: UserRole, department: Option<&str>)
        -> DbResult<Option<Uuid>>;

    async fn resolve_top_authority(&self) -> DbResult<Option<Uuid>> {
        self.resolve_user(UserRole::President, None).await
    }

    async fn find_user(&self, user_id: Uuid) -> DbResult<Option<User>>;
}

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<Uuid, User>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.insert(user);
        self
    }

    pub fn insert(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Convenience for seeding an active role holder.
    pub fn member(
        self,
        id: Uuid,
        full_name: &str,
        role: UserRole,
        department: Option<&str>,
    ) -> Self {
        self.with_user(User {
            id,
            full_name: full_name.to_string(),
            email: format!("{}@example.edu", full_name.to_lowercase().replace(' ', ".")),
            role,
            department: department.map(str::to_string),
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        })
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn resolve_user(
        &self,
        role: UserRole,
        department: Option<&str>,
    ) -> DbResult<Option<Uuid>> {
        // BTreeMap iterates in id order, so the first match is the lowest id.
        Ok(self
            .users
            .values()
            .filter(|u| u.is_active && u.role == role)
            .find(|u| department.map_or(true, |d| u.department.as_deref() == Some(d)))
            .map(|u| u.id))
    }

    async fn find_user(&self, user_id: Uuid) -> DbResult<Option<User>> {
        Ok(self.users.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn picks_lowest_id_among_matching_holders() {
        let directory = StaticDirectory::new()
            .member(Uuid::from_u128(0x31), "Head B", UserRole::DepartmentHead, Some("CS"))
            .member(Uuid::from_u128(0x30), "Head A", UserRole::DepartmentHead, Some("CS"))
            .member(Uuid::from_u128(0x2f), "Head Math", UserRole::DepartmentHead, Some("Math"));

        let cs = directory
            .resolve_user(UserRole::DepartmentHead, Some("CS"))
            .await
            .unwrap();
        assert_eq!(cs, Some(Uuid::from_u128(0x30)));

        let any = directory.resolve_user(UserRole::DepartmentHead, None).await.unwrap();
        assert_eq!(any, Some(Uuid::from_u128(0x2f)));

        assert_eq!(directory.resolve_top_authority().await.unwrap(), None);
    }

    #[tokio::test]
    async fn inactive_users_are_skipped() {
        let mut directory = StaticDirectory::new();
        directory.insert(User {
            id: Uuid::from_u128(1),
            full_name: "Former President".to_string(),
            email: "former@example.edu".to_string(),
            role: UserRole::President,
            department: None,
            is_active: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        });
        let directory = directory.member(Uuid::from_u128(2), "President", UserRole::President, None);

        assert_eq!(
            directory.resolve_top_authority().await.unwrap(),
            Some(Uuid::from_u128(2))
        );
    }
}
