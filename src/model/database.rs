//! The full set of users and groups, as loaded from and saved to storage

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Group, Permissions, PosixId, User};

/// All users and groups. Read and written as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Database {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn user(&self, login_name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.login_name == login_name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Groups the user is a member of
    pub fn groups_of<'a>(&'a self, user: &'a User) -> impl Iterator<Item = &'a Group> + 'a {
        self.groups.iter().filter(move |g| g.contains_user(user))
    }

    /// Union of the permissions of every group containing the user
    pub fn effective_permissions(&self, user: &User) -> Permissions {
        self.groups_of(user)
            .fold(Permissions::default(), |acc, g| acc.union(g.permissions))
    }

    /// Check the invariants the storage layer must uphold before saving.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut login_names = HashSet::new();
        let mut uids: HashSet<PosixId> = HashSet::new();
        for user in &self.users {
            if !login_names.insert(user.login_name.as_str()) {
                return Err(ValidationError::DuplicateLoginName(user.login_name.clone()));
            }
            if let Some(uid) = user.posix_uid() {
                if !uids.insert(uid) {
                    return Err(ValidationError::DuplicateUid(uid));
                }
            }
        }

        let mut group_names = HashSet::new();
        let mut gids: HashSet<PosixId> = HashSet::new();
        for group in &self.groups {
            if !group_names.insert(group.name.as_str()) {
                return Err(ValidationError::DuplicateGroupName(group.name.clone()));
            }
            if let Some(gid) = group.posix_gid {
                if !gids.insert(gid) {
                    return Err(ValidationError::DuplicateGid(gid));
                }
            }
            if let Some(missing) = group
                .member_login_names
                .sorted()
                .into_iter()
                .find(|name| !login_names.contains(name))
            {
                return Err(ValidationError::UnknownMember {
                    group: group.name.clone(),
                    login_name: missing.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate login name: {0}")]
    DuplicateLoginName(String),

    #[error("duplicate group name: {0}")]
    DuplicateGroupName(String),

    #[error("POSIX UID {0} is used by more than one user")]
    DuplicateUid(PosixId),

    #[error("POSIX GID {0} is used by more than one group")]
    DuplicateGid(PosixId),

    #[error("group {group} has unknown member {login_name}")]
    UnknownMember { group: String, login_name: String },
}
