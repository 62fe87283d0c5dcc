//! Integration tests for running slapd and portunus-server

mod common;

use std::fs;

use portunus::supervisor::{run_server, supervise, SupervisorError};
use portunus::OrchestratorError;
use tokio_test::{assert_err, assert_ok};

/// Stands in for slapd: ignores the slapd flags and stays up
const FAKE_SLAPD: &str = "/bin/sh -c 'sleep 30'";

#[tokio::test]
async fn test_server_success() {
    let dir = common::unique_test_dir();
    let config = common::test_config(
        &dir,
        &[("PORTUNUS_SLAPD_BINARY", FAKE_SLAPD), ("PORTUNUS_SERVER_BINARY", "/bin/true")],
    );

    assert_ok!(supervise(&config).await);
}

#[tokio::test]
async fn test_server_failure_is_fatal_without_retry() {
    let dir = common::unique_test_dir();
    let counter = dir.join("runs");
    let server = format!("/bin/sh -c 'echo run >> {}; exit 7'", counter.display());
    let config = common::test_config(
        &dir,
        &[("PORTUNUS_SLAPD_BINARY", FAKE_SLAPD), ("PORTUNUS_SERVER_BINARY", server.as_str())],
    );

    let err = assert_err!(supervise(&config).await);
    match &err {
        SupervisorError::ServerExited(status) => assert_eq!(status.code(), Some(7)),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("portunus-server"));
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 1);
}

#[tokio::test]
async fn test_slapd_exit_is_fatal() {
    let dir = common::unique_test_dir();
    let config = common::test_config(
        &dir,
        &[
            ("PORTUNUS_SLAPD_BINARY", "/bin/sh -c 'exit 1'"),
            ("PORTUNUS_SERVER_BINARY", "/bin/sh -c 'sleep 30'"),
        ],
    );

    let err = assert_err!(supervise(&config).await);
    assert!(matches!(err, SupervisorError::SlapdExited(_)), "{}", err);
}

#[tokio::test]
async fn test_missing_server_binary() {
    let dir = common::unique_test_dir();
    let config = common::test_config(
        &dir,
        &[
            ("PORTUNUS_SLAPD_BINARY", FAKE_SLAPD),
            ("PORTUNUS_SERVER_BINARY", "/nonexistent/portunus-server"),
        ],
    );

    let err = assert_err!(supervise(&config).await);
    assert!(matches!(err, SupervisorError::Spawn { .. }), "{}", err);
    assert!(err.to_string().contains("/nonexistent/portunus-server"));
}

#[tokio::test]
async fn test_server_environment_is_explicit() {
    let dir = common::unique_test_dir();
    let server = r#"/bin/sh -c 'test -z "$HOME" && test "$PORTUNUS_LDAP_SUFFIX" = dc=example,dc=org && test "$PORTUNUS_SERVER_HTTP_SECURE" = true && test ${#PORTUNUS_LDAP_PASSWORD} -eq 32'"#;
    let config = common::test_config(&dir, &[("PORTUNUS_SERVER_BINARY", server)]);

    assert_ok!(run_server(&config).await);
}

#[tokio::test]
async fn test_run_bootstraps_then_fails_with_server() {
    let dir = common::unique_test_dir();
    let config = common::test_config(
        &dir,
        &[
            ("PORTUNUS_SLAPD_BINARY", FAKE_SLAPD),
            ("PORTUNUS_SERVER_BINARY", "/bin/sh -c 'exit 7'"),
        ],
    );

    let err = assert_err!(portunus::run(&config).await);
    assert!(matches!(
        err,
        OrchestratorError::Supervisor(SupervisorError::ServerExited(_))
    ));
    assert!(config.slapd.state_dir.join("slapd.conf").is_file());
}
