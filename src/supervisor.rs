//! Running slapd and portunus-server
//!
//! slapd runs as a background task for as long as this program lives.
//! portunus-server runs in the foreground; its exit ends the program. Any
//! failure of either is fatal. Restarting is left to whatever started us.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::bootstrap::SlapdLayout;
use crate::config::{
    Config, ENV_DEBUG, ENV_LDAP_PASSWORD, ENV_LDAP_SUFFIX, ENV_SERVER_GID,
    ENV_SERVER_HTTP_LISTEN, ENV_SERVER_HTTP_SECURE, ENV_SERVER_STATE_DIR, ENV_SERVER_UID,
    ENV_SLAPD_TLS_DOMAIN_NAME,
};

/// Listener URLs passed to `slapd -h`
pub fn slapd_urls(config: &Config) -> &'static str {
    if config.slapd.tls.is_some() {
        "ldap:/// ldaps:///"
    } else {
        "ldap:///"
    }
}

/// The complete environment of portunus-server. Nothing else from our own
/// environment is passed on.
pub fn server_environment(config: &Config) -> Vec<(&'static str, String)> {
    let domain_name = config
        .slapd
        .tls
        .as_ref()
        .map(|tls| tls.domain_name.clone())
        .unwrap_or_default();

    let mut env = vec![
        (ENV_SERVER_UID, config.server.identity.uid.to_string()),
        (ENV_SERVER_GID, config.server.identity.gid.to_string()),
        (ENV_DEBUG, config.debug.to_string()),
        (ENV_LDAP_SUFFIX, config.ldap_suffix.clone()),
        (ENV_LDAP_PASSWORD, config.ldap_password.clone()),
        (ENV_SERVER_HTTP_LISTEN, config.server.http_listen.clone()),
        (ENV_SERVER_HTTP_SECURE, config.server.http_secure.to_string()),
        (ENV_SERVER_STATE_DIR, config.server.state_dir.display().to_string()),
        (ENV_SLAPD_TLS_DOMAIN_NAME, domain_name),
    ];
    if let Some(path) = &config.path {
        env.push(("PATH", path.clone()));
    }
    env
}

/// Build the slapd invocation. slapd drops to its configured user and group
/// itself.
pub fn slapd_command(config: &Config) -> Result<Command, SupervisorError> {
    let (program, args) = parse_command(&config.slapd.binary)?;
    let layout = SlapdLayout::new(&config.slapd.state_dir);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg("-u")
        .arg(&config.slapd.user)
        .arg("-g")
        .arg(&config.slapd.group)
        .arg("-h")
        .arg(slapd_urls(config))
        .arg("-f")
        .arg(layout.config_file())
        .arg("-d")
        .arg("0")
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    Ok(cmd)
}

/// Build the portunus-server invocation with its curated environment.
pub fn server_command(config: &Config) -> Result<Command, SupervisorError> {
    let (program, args) = parse_command(&config.server.binary)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(server_environment(config))
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    Ok(cmd)
}

/// Spawn slapd. The caller owns the child and must stop it with
/// [`stop_slapd`].
pub fn spawn_slapd(config: &Config) -> Result<Child, SupervisorError> {
    let child = slapd_command(config)?
        .spawn()
        .map_err(|e| SupervisorError::Spawn {
            program: config.slapd.binary.clone(),
            source: e,
        })?;
    log::info!("Started slapd (pid {})", child.id().unwrap_or_default());
    Ok(child)
}

/// Wait for slapd to exit. slapd must outlive portunus-server, so every
/// outcome of this function is an error.
async fn wait_slapd(child: &mut Child, config: &Config) -> SupervisorError {
    match child.wait().await {
        Ok(status) => SupervisorError::SlapdExited(status),
        Err(e) => SupervisorError::Wait {
            program: config.slapd.binary.clone(),
            source: e,
        },
    }
}

/// Kill slapd and reap it. Returns once the process is gone.
pub async fn stop_slapd(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    let pid = child.id();
    match child.kill().await {
        Ok(()) => log::debug!("Stopped slapd (pid {})", pid.unwrap_or_default()),
        Err(e) => log::warn!("Failed to stop slapd: {}", e),
    }
}

/// Run portunus-server in the foreground and wait for it.
pub async fn run_server(config: &Config) -> Result<(), SupervisorError> {
    let mut child = server_command(config)?
        .spawn()
        .map_err(|e| SupervisorError::Spawn {
            program: config.server.binary.clone(),
            source: e,
        })?;
    log::info!("Started portunus-server (pid {})", child.id().unwrap_or_default());

    let status = child.wait().await.map_err(|e| SupervisorError::Wait {
        program: config.server.binary.clone(),
        source: e,
    })?;

    if status.success() {
        log::info!("portunus-server exited normally");
        Ok(())
    } else {
        Err(SupervisorError::ServerExited(status))
    }
}

/// Start slapd in the background, then run portunus-server until it exits.
///
/// Must only be called once [`bootstrap`](crate::bootstrap::bootstrap) has
/// succeeded. slapd has been killed and reaped by the time this returns,
/// whatever the outcome.
pub async fn supervise(config: &Config) -> Result<(), SupervisorError> {
    let mut slapd = spawn_slapd(config)?;

    let result = tokio::select! {
        e = wait_slapd(&mut slapd, config) => Err(e),
        result = run_server(config) => result,
    };

    stop_slapd(&mut slapd).await;
    result
}

/// Split a configured command line into program and arguments
fn parse_command(cmd: &str) -> Result<(String, Vec<String>), SupervisorError> {
    let mut parts = shlex::split(cmd)
        .ok_or_else(|| SupervisorError::InvalidCommand(cmd.to_string()))?
        .into_iter();
    let program = parts
        .next()
        .ok_or_else(|| SupervisorError::InvalidCommand(cmd.to_string()))?;
    Ok((program, parts.collect()))
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),

    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error encountered while running slapd: {0}")]
    SlapdExited(ExitStatus),

    #[error("error encountered while running portunus-server: {0}")]
    ServerExited(ExitStatus),
}
