//! POSIX user and group ids

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A POSIX user or group ID.
///
/// Uniqueness within users or within groups is enforced by
/// [`Database::validate`](super::Database::validate), not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PosixId(u16);

impl PosixId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<u16> for PosixId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl From<PosixId> for u32 {
    fn from(id: PosixId) -> Self {
        u32::from(id.0)
    }
}

/// Accepts exactly the strings `Display` produces: decimal digits, no sign,
/// no leading zeros.
impl FromStr for PosixId {
    type Err = ParsePosixIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.bytes().all(|b| b.is_ascii_digit()) || (s.len() > 1 && s.starts_with('0')) {
            return Err(ParsePosixIdError::NotCanonical(s.to_string()));
        }
        Ok(Self(s.parse::<u16>()?))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParsePosixIdError {
    #[error("{0:?} is not a plain decimal POSIX ID")]
    NotCanonical(String),

    #[error("invalid POSIX ID: {0}")]
    Int(#[from] ParseIntError),
}

impl fmt::Display for PosixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
