use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Institutional roles a complaint can be routed through, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Handler,
    DepartmentHead,
    CollegeDean,
    CampusRegistrar,
    UniversityRegistrar,
    AdministrativeVp,
    President,
}

impl UserRole {
    pub const ALL: [UserRole; 7] = [
        UserRole::Handler,
        UserRole::DepartmentHead,
        UserRole::CollegeDean,
        UserRole::CampusRegistrar,
        UserRole::UniversityRegistrar,
        UserRole::AdministrativeVp,
        UserRole::President,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Handler => "handler",
            UserRole::DepartmentHead => "department_head",
            UserRole::CollegeDean => "college_dean",
            UserRole::CampusRegistrar => "campus_registrar",
            UserRole::UniversityRegistrar => "university_registrar",
            UserRole::AdministrativeVp => "administrative_vp",
            UserRole::President => "president",
        }
    }

    /// Title used in notification and report text.
    pub fn title(&self) -> &'static str {
        match self {
            UserRole::Handler => "Handler",
            UserRole::DepartmentHead => "Department Head",
            UserRole::CollegeDean => "College Dean",
            UserRole::CampusRegistrar => "Campus Registrar",
            UserRole::UniversityRegistrar => "University Registrar",
            UserRole::AdministrativeVp => "Administrative Vice-President",
            UserRole::President => "President",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Directory record for a role holder. Read-only to the workflow.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_wire_name() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!(" College_Dean ".parse::<UserRole>().unwrap(), UserRole::CollegeDean);
        assert!("registrar".parse::<UserRole>().is_err());
    }
}
