use crate::db::UserRole;

/// What a role may do with a complaint routed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_decide: bool,
    pub can_resolve_first_line: bool,
    pub assign_to: &'static [UserRole],
    /// The first target is the structural next role.
    pub escalate_to: &'static [UserRole],
}

impl UserRole {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            UserRole::Handler => Capabilities {
                can_decide: false,
                can_resolve_first_line: true,
                assign_to: &[UserRole::DepartmentHead],
                escalate_to: &[],
            },
            UserRole::DepartmentHead => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[],
                escalate_to: &[UserRole::CollegeDean],
            },
            UserRole::CollegeDean => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[],
                escalate_to: &[UserRole::CampusRegistrar, UserRole::UniversityRegistrar],
            },
            UserRole::CampusRegistrar => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[UserRole::UniversityRegistrar],
                escalate_to: &[UserRole::AdministrativeVp],
            },
            UserRole::UniversityRegistrar => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[],
                escalate_to: &[UserRole::AdministrativeVp],
            },
            UserRole::AdministrativeVp => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[],
                escalate_to: &[UserRole::President],
            },
            UserRole::President => Capabilities {
                can_decide: true,
                can_resolve_first_line: false,
                assign_to: &[],
                escalate_to: &[],
            },
        }
    }

    pub fn can_assign_to(self, target: UserRole) -> bool {
        self.capabilities().assign_to.contains(&target)
    }

    pub fn can_escalate_to(self, target: UserRole) -> bool {
        self.capabilities().escalate_to.contains(&target)
    }

    pub fn next_role(self) -> Option<UserRole> {
        self.capabilities().escalate_to.first().copied()
    }

    /// Directory lookups for these roles honour the department hint.
    pub fn is_department_scoped(self) -> bool {
        matches!(
            self,
            UserRole::Handler | UserRole::DepartmentHead | UserRole::CollegeDean
        )
    }

    pub fn is_top_authority(self) -> bool {
        self == UserRole::President
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_climbs_to_a_single_terminal() {
        // Following next_role from the bottom must reach the president without cycles.
        let mut role = UserRole::DepartmentHead;
        let mut seen = vec![role];
        while let Some(next) = role.next_role() {
            assert!(next > role, "{} escalates downwards to {}", role, next);
            assert!(!seen.contains(&next));
            seen.push(next);
            role = next;
        }
        assert_eq!(role, UserRole::President);
        assert!(UserRole::ALL
            .iter()
            .all(|r| r.capabilities().escalate_to.iter().all(|t| t > r)));
    }

    #[test]
    fn lateral_and_first_hop_assignments() {
        assert!(UserRole::Handler.can_assign_to(UserRole::DepartmentHead));
        assert!(UserRole::CampusRegistrar.can_assign_to(UserRole::UniversityRegistrar));
        assert!(!UserRole::DepartmentHead.can_assign_to(UserRole::Handler));
        assert!(!UserRole::Handler.can_escalate_to(UserRole::CollegeDean));
    }

    #[test]
    fn only_first_line_handler_skips_the_decide_capability() {
        for role in UserRole::ALL {
            let caps = role.capabilities();
            assert_eq!(caps.can_decide, role != UserRole::Handler);
            assert_eq!(caps.can_resolve_first_line, role == UserRole::Handler);
        }
    }
}
