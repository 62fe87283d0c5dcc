//! Groups and their membership

use serde::{Deserialize, Serialize};

use super::{MemberLoginNames, Permissions, PosixId, User};

/// A group of users. Membership grants the group's [`Permissions`] to every
/// member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub long_name: String,
    #[serde(rename = "members", default)]
    pub member_login_names: MemberLoginNames,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posix_gid: Option<PosixId>,
}

impl Group {
    pub fn new(name: impl Into<String>, long_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            long_name: long_name.into(),
            ..Default::default()
        }
    }

    pub fn contains_user(&self, user: &User) -> bool {
        self.member_login_names.contains(&user.login_name)
    }

    pub fn add_member(&mut self, user: &User) -> bool {
        self.member_login_names.insert(user.login_name.clone())
    }

    pub fn remove_member(&mut self, user: &User) -> bool {
        self.member_login_names.remove(&user.login_name)
    }

    pub fn set_posix_gid(&mut self, gid: Option<PosixId>) {
        self.posix_gid = gid;
    }

    /// Compares every field. Membership is compared as a set.
    pub fn is_equal_to(&self, other: &Group) -> bool {
        self.name == other.name
            && self.long_name == other.long_name
            && self.member_login_names == other.member_login_names
            && self.permissions == other.permissions
            && self.posix_gid == other.posix_gid
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for Group {}
