use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// Access level attached to a verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// An ordinary signed-in member.
    Member,
    /// A member with administrative rights.
    Admin,
}

/// A verified caller identity, as supplied by the external identity provider.
///
/// The engine never authenticates anyone itself; the request layer hands it
/// an already-verified user id and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user: Id,
    pub role: Role,
}

impl Identity {
    /// An ordinary member identity.
    pub fn member(user: Id) -> Self {
        Self {
            user,
            role: Role::Member,
        }
    }

    /// An administrator identity.
    pub fn admin(user: Id) -> Self {
        Self {
            user,
            role: Role::Admin,
        }
    }

    /// Does this identity carry the given role?
    pub fn permits(&self, target: Role) -> bool {
        self.role == target
    }

    /// Reject callers without administrative rights.
    pub fn require_admin(&self) -> Result<()> {
        if self.permits(Role::Admin) {
            Ok(())
        } else {
            Err(Error::Forbidden(
                "administrator rights are required for this operation".to_string(),
            ))
        }
    }
}
