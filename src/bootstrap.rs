//! Filesystem preparation for slapd and portunus-server
//!
//! Runs with enough privilege to chown, before either child is started.
//! slapd's state directory is wiped on every start: its contents are
//! regenerated from portunus-server's database, so nothing in it may survive
//! a restart. Every step is fatal on failure; a half-prepared tree is never
//! handed to slapd.

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::config::{Config, Identity};
use crate::render;

const STATE_DIR_MODE: u32 = 0o700;
const DATA_DIR_MODE: u32 = 0o770;
const READ_ONLY_MODE: u32 = 0o444;
const SERVER_STATE_DIR_MODE: u32 = 0o770;

/// File names inside slapd's state directory
#[derive(Debug, Clone)]
pub struct SlapdLayout {
    root: PathBuf,
}

impl SlapdLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn schema_file(&self) -> PathBuf {
        self.root.join("portunus.schema")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("slapd.conf")
    }

    pub fn cert_file(&self) -> PathBuf {
        self.root.join("cert.pem")
    }

    pub fn key_file(&self) -> PathBuf {
        self.root.join("key.pem")
    }

    pub fn ca_file(&self) -> PathBuf {
        self.root.join("ca.pem")
    }
}

/// Prepare both state directories. Steps run strictly in order; the first
/// failure aborts the rest.
pub fn bootstrap(config: &Config, password_hash: &str) -> Result<(), BootstrapError> {
    let layout = SlapdLayout::new(&config.slapd.state_dir);
    let slapd = config.slapd.identity;

    // delete leftovers from previous runs
    remove_dir_all(layout.root())?;

    create_dir(layout.root(), STATE_DIR_MODE)?;
    chown(layout.root(), slapd)?;

    create_dir(&layout.data_dir(), DATA_DIR_MODE)?;
    chown(&layout.data_dir(), slapd)?;

    write_read_only(&layout.schema_file(), render::CUSTOM_SCHEMA.as_bytes())?;
    write_read_only(
        &layout.config_file(),
        &render::render_slapd_config(config, password_hash),
    )?;

    // copy TLS material to where slapd can read it after dropping privileges
    if let Some(tls) = &config.slapd.tls {
        for (src, dst) in [
            (&tls.certificate, layout.cert_file()),
            (&tls.private_key, layout.key_file()),
            (&tls.ca_certificate, layout.ca_file()),
        ] {
            copy_file(src, &dst)?;
            chown(&dst, slapd)?;
        }
    }

    create_dir_all(&config.server.state_dir, SERVER_STATE_DIR_MODE)?;
    chown(&config.server.state_dir, config.server.identity)?;

    log::info!(
        "Prepared {} and {}",
        layout.root().display(),
        config.server.state_dir.display()
    );
    Ok(())
}

fn remove_dir_all(path: &Path) -> Result<(), BootstrapError> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            log::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BootstrapError::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Create a single directory with exactly `mode`, regardless of umask.
fn create_dir(path: &Path, mode: u32) -> Result<(), BootstrapError> {
    DirBuilder::new()
        .mode(mode)
        .create(path)
        .and_then(|()| fs::set_permissions(path, Permissions::from_mode(mode)))
        .map_err(|e| BootstrapError::CreateDir {
            path: path.to_path_buf(),
            source: e,
        })?;
    log::debug!("Created {} (mode {:o})", path.display(), mode);
    Ok(())
}

/// Like [`create_dir`], but tolerates existing directories and creates
/// missing parents.
fn create_dir_all(path: &Path, mode: u32) -> Result<(), BootstrapError> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .and_then(|()| fs::set_permissions(path, Permissions::from_mode(mode)))
        .map_err(|e| BootstrapError::CreateDir {
            path: path.to_path_buf(),
            source: e,
        })?;
    log::debug!("Ensured {} (mode {:o})", path.display(), mode);
    Ok(())
}

fn chown(path: &Path, owner: Identity) -> Result<(), BootstrapError> {
    nix::unistd::chown(path, Some(owner.uid), Some(owner.gid)).map_err(|e| {
        BootstrapError::Chown {
            path: path.to_path_buf(),
            owner,
            source: e,
        }
    })?;
    log::debug!("Changed owner of {} to {}:{}", path.display(), owner.uid, owner.gid);
    Ok(())
}

fn write_read_only(path: &Path, contents: &[u8]) -> Result<(), BootstrapError> {
    let write = || -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(READ_ONLY_MODE)
            .open(path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::set_permissions(path, Permissions::from_mode(READ_ONLY_MODE))
    };
    write().map_err(|e| BootstrapError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), BootstrapError> {
    fs::copy(src, dst).map_err(|e| BootstrapError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source: e,
    })?;
    log::debug!("Copied {} to {}", src.display(), dst.display());
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("cannot remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot change owner of {} to {}:{}: {source}", .path.display(), .owner.uid, .owner.gid)]
    Chown {
        path: PathBuf,
        owner: Identity,
        #[source]
        source: nix::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy {} to {}: {source}", .src.display(), .dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
}
