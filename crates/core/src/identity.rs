//! Request-scoped identity.
//!
//! Every ledger call receives the caller explicitly; there is no ambient
//! session state anywhere in the core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{BookingError, BookingResult},
    models::user::Role,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Authorization` unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> BookingResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(BookingError::Authorization(format!(
                "Role {} may not perform this action",
                self.role
            )))
        }
    }

    pub fn require_admin(&self) -> BookingResult<()> {
        self.require_role(&[Role::Admin])
    }
}
