//! Resolved user identity (`GET /users/info`).

use serde::{Deserialize, Serialize};

/// Numeric role as stored by the backend.
///
/// `0` is a regular shopper and `1` an administrator; other values are
/// carried through untouched and treated as non-admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(i32);

impl Role {
    /// Regular shopper.
    pub const CUSTOMER: Self = Self(0);
    /// Store administrator.
    pub const ADMIN: Self = Self(1);

    #[must_use]
    pub const fn new(role: i32) -> Self {
        Self(role)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Whether this role may manage the catalog.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        self.0 == Self::ADMIN.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_admin() {
            write!(f, "admin")
        } else {
            write!(f, "customer")
        }
    }
}

/// The logged-in user as reported by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_is_role_one() {
        let json = r#"{ "_id": "u1", "name": "Ada", "email": "ada@example.com", "role": 1, "cart": [] }"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert!(identity.is_admin());
        assert_eq!(identity.role.to_string(), "admin");
    }

    #[test]
    fn test_missing_role_is_customer() {
        let identity: Identity = serde_json::from_str(r#"{ "name": "Bo" }"#).unwrap();
        assert!(!identity.is_admin());
        assert_eq!(identity.role, Role::CUSTOMER);
        assert!(!Role::new(2).is_admin());
    }
}
