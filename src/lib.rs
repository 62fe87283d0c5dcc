//! portunus-orchestrator - starts slapd and portunus-server
//!
//! Runs as root and:
//! - Prepares slapd's state directory and portunus-server's state directory
//!   with the right owners and modes
//! - Renders slapd.conf with a freshly generated service password
//! - Runs slapd in the background and portunus-server in the foreground
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              portunus-orchestrator              │
//! ├─────────────────────────────────────────────────┤
//! │   Config   │  Bootstrap  │     Supervisor       │
//! ├─────────────────────────────────────────────────┤
//! │  Render  │  Crypt  │        Domain model        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod config;
pub mod crypt;
pub mod model;
pub mod render;
pub mod supervisor;

pub use config::Config;
pub use model::{Database, Group, MemberLoginNames, Permissions, PosixId, User};

use std::io::Write;

use crypt::{PasswordHasher, Ssha512Hasher};

/// Everything that can stop the orchestrator
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Hash(#[from] crypt::HashError),

    #[error(transparent)]
    Bootstrap(#[from] bootstrap::BootstrapError),

    #[error(transparent)]
    Supervisor(#[from] supervisor::SupervisorError),

    #[error("cannot write rendered slapd.conf: {0}")]
    Output(#[source] std::io::Error),
}

/// Hash the service password for slapd's `rootpw`.
pub fn hash_service_password(config: &Config) -> Result<String, OrchestratorError> {
    let hasher = Ssha512Hasher::new()?;
    Ok(hasher.hash(&config.ldap_password))
}

/// Bootstrap the filesystem, then run both processes until portunus-server
/// exits.
pub async fn run(config: &Config) -> Result<(), OrchestratorError> {
    let password_hash = hash_service_password(config)?;
    bootstrap::bootstrap(config, &password_hash)?;
    supervisor::supervise(config).await?;
    Ok(())
}

/// Write the `slapd.conf` a real run would produce, without touching the
/// filesystem.
pub fn write_rendered_config<W: Write>(config: &Config, out: &mut W) -> Result<(), OrchestratorError> {
    let password_hash = hash_service_password(config)?;
    out.write_all(&render::render_slapd_config(config, &password_hash))
        .and_then(|()| out.flush())
        .map_err(OrchestratorError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config() -> Config {
        let lookup = |key: &str| match key {
            "PORTUNUS_LDAP_SUFFIX" => Some("dc=example,dc=org".to_string()),
            "PORTUNUS_SERVER_USER" | "PORTUNUS_SLAPD_USER" => Some("0".to_string()),
            _ => None,
        };
        Config::from_lookup(lookup).unwrap()
    }

    #[test]
    fn test_write_rendered_config() {
        let config = config();
        let mut out = Vec::new();
        write_rendered_config(&config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("rootpw \"{SSHA512}"));
        assert!(!text.contains(&config.ldap_password));
    }

    #[test]
    fn test_write_failure_is_an_output_error() {
        let err = write_rendered_config(&config(), &mut BrokenPipe).unwrap_err();
        assert!(matches!(err, OrchestratorError::Output(_)), "{}", err);
        assert!(err.to_string().contains("slapd.conf"));
    }
}
