//! Password hashing
//!
//! slapd only ever sees the hashed root password. Records use the salted
//! SHA-512 scheme understood by OpenLDAP's `pw-sha2` module:
//! `{SSHA512}` followed by base64(sha512(password || salt) || salt).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha512};

const SCHEME: &str = "{SSHA512}";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 64;

/// Length of the generated LDAP bind password
pub const SERVICE_PASSWORD_LEN: usize = 32;

/// Hashes and verifies passwords. Implementations produce records that
/// slapd accepts in `rootpw` and `userPassword`.
pub trait PasswordHasher {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, record: &str, password: &str) -> bool;
}

/// Salted SHA-512 hasher
#[derive(Debug)]
pub struct Ssha512Hasher {
    _private: (),
}

impl Ssha512Hasher {
    /// Fails if the OS random source is unusable, since every hash needs a
    /// fresh salt.
    pub fn new() -> Result<Self, HashError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| HashError::Rng(e.to_string()))?;
        Ok(Self { _private: () })
    }

    fn digest(password: &str, salt: &[u8]) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(password.as_bytes());
        hasher.update(salt);
        hasher.finalize().to_vec()
    }
}

impl PasswordHasher for Ssha512Hasher {
    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut payload = Self::digest(password, &salt);
        payload.extend_from_slice(&salt);
        format!("{}{}", SCHEME, STANDARD.encode(payload))
    }

    fn verify(&self, record: &str, password: &str) -> bool {
        let Some(encoded) = record.strip_prefix(SCHEME) else {
            return false;
        };
        let Ok(payload) = STANDARD.decode(encoded) else {
            return false;
        };
        if payload.len() <= DIGEST_LEN {
            return false;
        }
        let (expected, salt) = payload.split_at(DIGEST_LEN);
        constant_time_eq(expected, &Self::digest(password, salt))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Random alphanumeric password for the service bind DN. Regenerated on
/// every start; only portunus-server and slapd ever learn it.
pub fn generate_service_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SERVICE_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("cannot initialize password hasher: random source unavailable: {0}")]
    Rng(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Ssha512Hasher::new().unwrap();
        let record = hasher.hash("swordfish");
        assert!(record.starts_with("{SSHA512}"));
        assert!(hasher.verify(&record, "swordfish"));
        assert!(!hasher.verify(&record, "swordfish2"));
        assert!(!hasher.verify(&record, ""));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = Ssha512Hasher::new().unwrap();
        let a = hasher.hash("same");
        let b = hasher.hash("same");
        assert_ne!(a, b);
        assert!(hasher.verify(&a, "same"));
        assert!(hasher.verify(&b, "same"));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let hasher = Ssha512Hasher::new().unwrap();
        assert!(!hasher.verify("plaintext", "plaintext"));
        assert!(!hasher.verify("{SSHA512}!!!", "x"));
        assert!(!hasher.verify("{SSHA512}AAAA", "x"));
        assert!(!hasher.verify("{CRYPT}$6$abc", "x"));
    }

    #[test]
    fn test_service_password() {
        let a = generate_service_password();
        let b = generate_service_password();
        assert_eq!(a.len(), SERVICE_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
