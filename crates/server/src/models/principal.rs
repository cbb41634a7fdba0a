//! The authenticated caller.

use serde::{Deserialize, Serialize};

use order_tracker_core::{Order, Role, UserId};

/// Identity established from a verified access token.
///
/// Extracted once per request and passed explicitly into service functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User's ID in the account system.
    pub user_id: UserId,
    /// What the user is allowed to do.
    pub role: Role,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the principal has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins can read every order; customers only their own.
    #[must_use]
    pub fn can_read(&self, order: &Order) -> bool {
        self.is_admin() || order.is_owned_by(self.user_id)
    }
}
