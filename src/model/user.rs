//! User accounts

use serde::{Deserialize, Serialize};

use super::PosixId;

/// A single user account.
///
/// Group memberships are not stored here; see
/// [`Database::groups_of`](super::Database::groups_of).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub login_name: String,
    pub given_name: String,
    pub family_name: String,
    #[serde(default, rename = "email", skip_serializing_if = "String::is_empty")]
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_public_keys: Vec<String>,
    /// Opaque credential record, never the plaintext
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posix: Option<UserPosixAttributes>,
}

/// Attributes for users that are also POSIX accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosixAttributes {
    pub uid: PosixId,
    pub gid: PosixId,
    #[serde(rename = "home")]
    pub home_directory: String,
    #[serde(default, rename = "shell", skip_serializing_if = "String::is_empty")]
    pub login_shell: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gecos: String,
}

impl User {
    pub fn new(login_name: impl Into<String>) -> Self {
        Self {
            login_name: login_name.into(),
            ..Default::default()
        }
    }

    /// Display name, given name first
    pub fn full_name(&self) -> String {
        match (self.given_name.is_empty(), self.family_name.is_empty()) {
            (false, false) => format!("{} {}", self.given_name, self.family_name),
            (false, true) => self.given_name.clone(),
            (true, false) => self.family_name.clone(),
            (true, true) => self.login_name.clone(),
        }
    }

    pub fn posix_uid(&self) -> Option<PosixId> {
        self.posix.as_ref().map(|p| p.uid)
    }

    /// Field-by-field equality. SSH keys compare in order since their order
    /// is user-visible.
    pub fn is_equal_to(&self, other: &User) -> bool {
        self.login_name == other.login_name
            && self.given_name == other.given_name
            && self.family_name == other.family_name
            && self.email_address == other.email_address
            && self.ssh_public_keys == other.ssh_public_keys
            && self.password_hash == other.password_hash
            && self.posix == other.posix
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl Eq for User {}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> User {
        User {
            login_name: "jane".into(),
            given_name: "Jane".into(),
            family_name: "Doe".into(),
            password_hash: "{SSHA512}abc".into(),
            posix: Some(UserPosixAttributes {
                uid: PosixId::new(1001),
                gid: PosixId::new(100),
                home_directory: "/home/jane".into(),
                login_shell: "/bin/sh".into(),
                gecos: String::new(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(jane().full_name(), "Jane Doe");
        assert_eq!(User::new("x").full_name(), "x");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = jane();
        let mut copy = original.clone();
        assert_eq!(copy, original);

        if let Some(posix) = copy.posix.as_mut() {
            posix.uid = PosixId::new(2000);
        }
        copy.ssh_public_keys.push("ssh-ed25519 AAAA".into());

        assert_eq!(original.posix_uid(), Some(PosixId::new(1001)));
        assert!(original.ssh_public_keys.is_empty());
        assert_ne!(copy, original);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(jane()).unwrap();
        assert_eq!(json["login_name"], "jane");
        assert_eq!(json["password"], "{SSHA512}abc");
        assert_eq!(json["posix"]["uid"], 1001);
        assert!(json.get("email").is_none());
    }
}
