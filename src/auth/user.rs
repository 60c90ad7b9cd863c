use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_DRIVER: &str = "driver";
pub const ROLE_ADMIN: &str = "admin";

/// The authenticated actor attached to a request. Token verification and
/// role assignment happen in the identity layer upstream of this service;
/// the engine only reads `id` and `roles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new(id: Uuid, roles: Vec<String>) -> Self {
        Self { id, roles }
    }

    /// Placeholder actor installed by the router until an identity
    /// middleware replaces it.
    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec![
                ROLE_ADMIN.into(),
                ROLE_CUSTOMER.into(),
                ROLE_DRIVER.into(),
            ],
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_checks() {
        let driver = User::new(Uuid::new_v4(), vec![ROLE_DRIVER.into()]);

        assert!(driver.has_role(ROLE_DRIVER));
        assert!(!driver.has_role(ROLE_CUSTOMER));
        assert!(!driver.is_admin());
    }
}
