//! Capability flags granted through group membership

use serde::{Deserialize, Serialize};

/// Permissions a group grants to each of its members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub portunus: PortunusPermissions,
    #[serde(default)]
    pub ldap: LdapPermissions,
}

/// Access to the Portunus management UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortunusPermissions {
    pub is_admin: bool,
}

/// Access to the directory contents through LDAP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapPermissions {
    pub can_read: bool,
}

impl Permissions {
    /// Returns the flags set in either `self` or `other`.
    pub fn union(self, other: Permissions) -> Permissions {
        Permissions {
            portunus: PortunusPermissions {
                is_admin: self.portunus.is_admin || other.portunus.is_admin,
            },
            ldap: LdapPermissions {
                can_read: self.ldap.can_read || other.ldap.can_read,
            },
        }
    }

    /// Merge `other` into `self`.
    pub fn include(&mut self, other: Permissions) {
        *self = self.union(other);
    }

    /// True if no flag is set.
    pub fn is_empty(&self) -> bool {
        !self.portunus.is_admin && !self.ldap.can_read
    }
}
