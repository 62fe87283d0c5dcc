//! Startup configuration
//!
//! The environment is read exactly once into an immutable [`Config`] that is
//! passed to every component.

use std::path::{Component, Path, PathBuf};

use nix::unistd::{Gid, Group, Uid, User};

use crate::crypt;

pub const ENV_DEBUG: &str = "PORTUNUS_DEBUG";
pub const ENV_LDAP_SUFFIX: &str = "PORTUNUS_LDAP_SUFFIX";
pub const ENV_LDAP_PASSWORD: &str = "PORTUNUS_LDAP_PASSWORD";
pub const ENV_SERVER_BINARY: &str = "PORTUNUS_SERVER_BINARY";
pub const ENV_SERVER_USER: &str = "PORTUNUS_SERVER_USER";
pub const ENV_SERVER_GROUP: &str = "PORTUNUS_SERVER_GROUP";
pub const ENV_SERVER_UID: &str = "PORTUNUS_SERVER_UID";
pub const ENV_SERVER_GID: &str = "PORTUNUS_SERVER_GID";
pub const ENV_SERVER_HTTP_LISTEN: &str = "PORTUNUS_SERVER_HTTP_LISTEN";
pub const ENV_SERVER_HTTP_SECURE: &str = "PORTUNUS_SERVER_HTTP_SECURE";
pub const ENV_SERVER_STATE_DIR: &str = "PORTUNUS_SERVER_STATE_DIR";
pub const ENV_SLAPD_BINARY: &str = "PORTUNUS_SLAPD_BINARY";
pub const ENV_SLAPD_USER: &str = "PORTUNUS_SLAPD_USER";
pub const ENV_SLAPD_GROUP: &str = "PORTUNUS_SLAPD_GROUP";
pub const ENV_SLAPD_SCHEMA_DIR: &str = "PORTUNUS_SLAPD_SCHEMA_DIR";
pub const ENV_SLAPD_STATE_DIR: &str = "PORTUNUS_SLAPD_STATE_DIR";
pub const ENV_SLAPD_TLS_CERTIFICATE: &str = "PORTUNUS_SLAPD_TLS_CERTIFICATE";
pub const ENV_SLAPD_TLS_PRIVATE_KEY: &str = "PORTUNUS_SLAPD_TLS_PRIVATE_KEY";
pub const ENV_SLAPD_TLS_CA_CERTIFICATE: &str = "PORTUNUS_SLAPD_TLS_CA_CERTIFICATE";
pub const ENV_SLAPD_TLS_DOMAIN_NAME: &str = "PORTUNUS_SLAPD_TLS_DOMAIN_NAME";

const DEFAULT_SERVER_BINARY: &str = "portunus-server";
const DEFAULT_SERVER_USER: &str = "portunus";
const DEFAULT_SERVER_HTTP_LISTEN: &str = "127.0.0.1:8080";
const DEFAULT_SERVER_STATE_DIR: &str = "/var/lib/portunus";
const DEFAULT_SLAPD_BINARY: &str = "slapd";
const DEFAULT_SLAPD_USER: &str = "ldap";
const DEFAULT_SLAPD_SCHEMA_DIR: &str = "/etc/openldap/schema";
const DEFAULT_SLAPD_STATE_DIR: &str = "/run/portunus-slapd";

/// Numeric owner for files and processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: Uid,
    pub gid: Gid,
}

impl Identity {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
        }
    }

    /// The identity this process runs as
    pub fn current() -> Self {
        Self {
            uid: nix::unistd::getuid(),
            gid: nix::unistd::getgid(),
        }
    }
}

/// TLS material for slapd. Only ever fully present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
    pub ca_certificate: PathBuf,
    pub domain_name: String,
}

/// Settings for portunus-server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub binary: String,
    pub identity: Identity,
    pub http_listen: String,
    pub http_secure: bool,
    pub state_dir: PathBuf,
}

/// Settings for slapd
#[derive(Debug, Clone)]
pub struct SlapdConfig {
    pub binary: String,
    /// User and group as given, passed through to `slapd -u/-g`
    pub user: String,
    pub group: String,
    pub identity: Identity,
    pub schema_dir: PathBuf,
    pub state_dir: PathBuf,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub ldap_suffix: String,
    /// Plaintext bind password for `cn=portunus,<suffix>`
    pub ldap_password: String,
    pub server: ServerConfig,
    pub slapd: SlapdConfig,
    /// Search path handed to portunus-server, if we had one
    pub path: Option<String>,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as unset. User and group names are resolved through NSS unless
    /// they are numeric.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let debug = parse_bool(ENV_DEBUG, &get_or(ENV_DEBUG, "false"))?;
        let http_secure = parse_bool(ENV_SERVER_HTTP_SECURE, &get_or(ENV_SERVER_HTTP_SECURE, "true"))?;

        let ldap_suffix = get(ENV_LDAP_SUFFIX).ok_or(ConfigError::Missing(ENV_LDAP_SUFFIX))?;
        validate_suffix(&ldap_suffix)?;

        let server_user = get_or(ENV_SERVER_USER, DEFAULT_SERVER_USER);
        let server_group = get_or(ENV_SERVER_GROUP, &server_user);
        let slapd_user = get_or(ENV_SLAPD_USER, DEFAULT_SLAPD_USER);
        let slapd_group = get_or(ENV_SLAPD_GROUP, &slapd_user);

        let tls = read_tls(&get)?;

        let server = ServerConfig {
            binary: get_or(ENV_SERVER_BINARY, DEFAULT_SERVER_BINARY),
            identity: resolve_identity(&server_user, &server_group)?,
            http_listen: get_or(ENV_SERVER_HTTP_LISTEN, DEFAULT_SERVER_HTTP_LISTEN),
            http_secure,
            state_dir: PathBuf::from(get_or(ENV_SERVER_STATE_DIR, DEFAULT_SERVER_STATE_DIR)),
        };

        let slapd = SlapdConfig {
            binary: get_or(ENV_SLAPD_BINARY, DEFAULT_SLAPD_BINARY),
            identity: resolve_identity(&slapd_user, &slapd_group)?,
            user: slapd_user,
            group: slapd_group,
            schema_dir: PathBuf::from(get_or(ENV_SLAPD_SCHEMA_DIR, DEFAULT_SLAPD_SCHEMA_DIR)),
            state_dir: PathBuf::from(get_or(ENV_SLAPD_STATE_DIR, DEFAULT_SLAPD_STATE_DIR)),
            tls,
        };

        // slapd's directory is wiped on every start, so neither may contain
        // the other
        let server_dir = normalize(&server.state_dir);
        let slapd_dir = normalize(&slapd.state_dir);
        if server_dir.starts_with(&slapd_dir) || slapd_dir.starts_with(&server_dir) {
            return Err(ConfigError::Invalid {
                key: ENV_SERVER_STATE_DIR,
                reason: format!(
                    "{} and {} ({}) must not be equal or nested",
                    server.state_dir.display(),
                    ENV_SLAPD_STATE_DIR,
                    slapd.state_dir.display()
                ),
            });
        }

        Ok(Self {
            debug,
            ldap_suffix,
            ldap_password: crypt::generate_service_password(),
            server,
            slapd,
            path: get("PATH"),
        })
    }

    /// Bind DN used by portunus-server, also slapd's root DN
    pub fn service_dn(&self) -> String {
        format!("cn=portunus,{}", self.ldap_suffix)
    }
}

/// All four TLS settings or none.
fn read_tls<F>(get: &F) -> Result<Option<TlsConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let certificate = get(ENV_SLAPD_TLS_CERTIFICATE);
    let private_key = get(ENV_SLAPD_TLS_PRIVATE_KEY);
    let ca_certificate = get(ENV_SLAPD_TLS_CA_CERTIFICATE);
    let domain_name = get(ENV_SLAPD_TLS_DOMAIN_NAME);

    match (certificate, private_key, ca_certificate, domain_name) {
        (None, None, None, None) => Ok(None),
        (Some(certificate), Some(private_key), Some(ca_certificate), Some(domain_name)) => {
            Ok(Some(TlsConfig {
                certificate: PathBuf::from(certificate),
                private_key: PathBuf::from(private_key),
                ca_certificate: PathBuf::from(ca_certificate),
                domain_name,
            }))
        }
        (None, ..) => Err(ConfigError::PartialTls(ENV_SLAPD_TLS_CERTIFICATE)),
        (_, None, ..) => Err(ConfigError::PartialTls(ENV_SLAPD_TLS_PRIVATE_KEY)),
        (_, _, None, _) => Err(ConfigError::PartialTls(ENV_SLAPD_TLS_CA_CERTIFICATE)),
        (_, _, _, None) => Err(ConfigError::PartialTls(ENV_SLAPD_TLS_DOMAIN_NAME)),
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically. Symlinks
/// are not followed; the directories need not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("expected \"true\" or \"false\", got {:?}", value),
        }),
    }
}

fn validate_suffix(suffix: &str) -> Result<(), ConfigError> {
    let well_formed = suffix.split(',').all(|rdn| {
        rdn.split_once('=')
            .is_some_and(|(attr, value)| !attr.trim().is_empty() && !value.trim().is_empty())
    });
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: ENV_LDAP_SUFFIX,
            reason: format!("{:?} is not a DN like \"dc=example,dc=org\"", suffix),
        })
    }
}

/// Resolve a user and group to numeric ids. Numeric values are taken as-is.
pub fn resolve_identity(user: &str, group: &str) -> Result<Identity, ConfigError> {
    Ok(Identity {
        uid: resolve_user(user)?,
        gid: resolve_group(group)?,
    })
}

fn resolve_user(user: &str) -> Result<Uid, ConfigError> {
    if let Ok(uid) = user.parse::<u32>() {
        return Ok(Uid::from_raw(uid));
    }
    match User::from_name(user) {
        Ok(Some(u)) => Ok(u.uid),
        Ok(None) => Err(ConfigError::UnknownUser(user.to_string())),
        Err(e) => Err(ConfigError::Lookup {
            name: user.to_string(),
            source: e,
        }),
    }
}

fn resolve_group(group: &str) -> Result<Gid, ConfigError> {
    if let Ok(gid) = group.parse::<u32>() {
        return Ok(Gid::from_raw(gid));
    }
    match Group::from_name(group) {
        Ok(Some(g)) => Ok(g.gid),
        Ok(None) => Err(ConfigError::UnknownGroup(group.to_string())),
        Err(e) => Err(ConfigError::Lookup {
            name: group.to_string(),
            source: e,
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("TLS is partially configured: {0} is missing (certificate, private key, CA certificate and domain name must be given together)")]
    PartialTls(&'static str),

    #[error("no such user: {0}")]
    UnknownUser(String),

    #[error("no such group: {0}")]
    UnknownGroup(String),

    #[error("cannot look up {name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: nix::Error,
    },
}
