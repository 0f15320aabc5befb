use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        })
    }
}

/// Which role tables list a given identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleMembership {
    pub admin: bool,
    pub teacher: bool,
    pub student: bool,
}

/// A caller that passed the guard for a specific role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("no identity supplied; pass --as <uuid> or set ATTENDANCE_USER_ID")]
    Unauthenticated,
    #[error("{id} is not registered as an admin, teacher or student")]
    Unregistered { id: Uuid },
    #[error("{id} is registered as {actual}; this command requires {required}")]
    Forbidden { id: Uuid, actual: Role, required: Role },
}

/// Admin membership wins over any other table the identity also appears in.
pub fn resolve_role(membership: RoleMembership) -> Option<Role> {
    if membership.admin {
        Some(Role::Admin)
    } else if membership.teacher {
        Some(Role::Teacher)
    } else if membership.student {
        Some(Role::Student)
    } else {
        None
    }
}

pub fn authorize(
    caller: Option<Uuid>,
    membership: RoleMembership,
    required: Role,
) -> Result<Identity, AccessError> {
    let id = caller.ok_or(AccessError::Unauthenticated)?;
    let actual = resolve_role(membership).ok_or(AccessError::Unregistered { id })?;

    if actual != required {
        return Err(AccessError::Forbidden {
            id,
            actual,
            required,
        });
    }

    Ok(Identity { id, role: actual })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_caller_is_unauthenticated() {
        let result = authorize(None, RoleMembership::default(), Role::Student);
        assert_eq!(result, Err(AccessError::Unauthenticated));
    }

    #[test]
    fn unknown_caller_is_unregistered() {
        let id = Uuid::new_v4();
        let result = authorize(Some(id), RoleMembership::default(), Role::Teacher);
        assert_eq!(result, Err(AccessError::Unregistered { id }));
    }

    #[test]
    fn admin_cannot_use_student_surface() {
        let id = Uuid::new_v4();
        let membership = RoleMembership {
            admin: true,
            student: true,
            ..RoleMembership::default()
        };
        let result = authorize(Some(id), membership, Role::Student);
        assert_eq!(
            result,
            Err(AccessError::Forbidden {
                id,
                actual: Role::Admin,
                required: Role::Student,
            })
        );
    }

    #[test]
    fn matching_role_yields_identity() {
        let id = Uuid::new_v4();
        let membership = RoleMembership {
            teacher: true,
            ..RoleMembership::default()
        };
        let identity = authorize(Some(id), membership, Role::Teacher).unwrap();
        assert_eq!(identity, Identity { id, role: Role::Teacher });
    }

    #[test]
    fn teacher_outranks_student_membership() {
        let membership = RoleMembership {
            admin: false,
            teacher: true,
            student: true,
        };
        assert_eq!(resolve_role(membership), Some(Role::Teacher));
    }
}
