//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use portunus::config::{Config, Identity};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_test_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = PathBuf::from(format!("/tmp/portunus-test-{}-{}", std::process::id(), id));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A config that points both state directories into `dir` and uses our own
/// uid/gid, so chown succeeds without root.
pub fn test_config(dir: &Path, extra: &[(&str, &str)]) -> Config {
    let me = Identity::current();
    let uid = me.uid.to_string();
    let gid = me.gid.to_string();
    let slapd_state = dir.join("slapd").display().to_string();
    let server_state = dir.join("server/state").display().to_string();

    let mut env: HashMap<String, String> = HashMap::new();
    for (k, v) in [
        ("PORTUNUS_LDAP_SUFFIX", "dc=example,dc=org"),
        ("PORTUNUS_SERVER_USER", uid.as_str()),
        ("PORTUNUS_SERVER_GROUP", gid.as_str()),
        ("PORTUNUS_SLAPD_USER", uid.as_str()),
        ("PORTUNUS_SLAPD_GROUP", gid.as_str()),
        ("PORTUNUS_SLAPD_STATE_DIR", slapd_state.as_str()),
        ("PORTUNUS_SERVER_STATE_DIR", server_state.as_str()),
        ("PATH", "/usr/bin:/bin"),
    ] {
        env.insert(k.to_string(), v.to_string());
    }
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key: &str| env.get(key).cloned()).unwrap()
}
