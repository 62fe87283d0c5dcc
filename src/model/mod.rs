//! Identity domain model
//!
//! Users, groups and the permissions they carry. Groups own membership; a
//! user's groups and effective permissions are always derived from the
//! [`Database`] rather than stored on the user.

mod database;
mod group;
mod members;
mod permissions;
mod posix;
mod user;

pub use database::{Database, ValidationError};
pub use group::Group;
pub use members::MemberLoginNames;
pub use permissions::{LdapPermissions, Permissions, PortunusPermissions};
pub use posix::{ParsePosixIdError, PosixId};
pub use user::{User, UserPosixAttributes};
