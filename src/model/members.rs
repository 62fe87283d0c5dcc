//! Group membership as a set of login names

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The login names of a group's members.
///
/// A name is either present (member) or absent (non-member). On the wire
/// this is a JSON array of strings sorted ascending, so encoded groups are
/// byte-stable no matter how the set was built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberLoginNames(HashSet<String>);

impl MemberLoginNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, login_name: &str) -> bool {
        self.0.contains(login_name)
    }

    /// Add a member. Returns false if the name was already a member.
    pub fn insert(&mut self, login_name: impl Into<String>) -> bool {
        self.0.insert(login_name.into())
    }

    /// Remove a member. Returns false if the name was not a member.
    pub fn remove(&mut self, login_name: &str) -> bool {
        self.0.remove(login_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Member names sorted ascending.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<S> for MemberLoginNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for MemberLoginNames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.sorted())
    }
}

impl<'de> Deserialize<'de> for MemberLoginNames {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.into_iter().collect())
    }
}
