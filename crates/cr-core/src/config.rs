//! Environment-variable configuration.
//!
//! The relay is configured exclusively through the environment its run
//! script sets up, following the invoking mail server's conventions. All
//! env access lives here; every reader has a pure "from parts" form so
//! tests never have to mutate process-global state.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::audit::{AuditSink, FileAudit, LogAudit, UNKNOWN_PEER};
use crate::backend::LdapSettings;

/// Presence enables the audit line for the subprocess variant.
pub const AUDIT_ENV: &str = "CR_AUTH_LOG";
/// Routes audit events to a JSON Lines file at this path (implies enabled).
pub const AUDIT_FILE_ENV: &str = "CR_AUTH_LOG_FILE";
/// Remote peer address, set by the connection supervisor.
pub const PEER_ENV: &str = "TCPREMOTEIP";
/// LDAP server host for the library backend.
pub const LDAP_HOST_ENV: &str = "LDAP_HOST";
/// LDAP server port for the library backend.
pub const LDAP_PORT_ENV: &str = "LDAP_PORT";
/// Overrides the subprocess backend tool.
pub const PROGRAM_ENV: &str = "CR_AUTH_PROGRAM";
/// Overrides the base argument vector, whitespace-separated.
pub const PROGRAM_ARGS_ENV: &str = "CR_AUTH_ARGS";

/// Default backend tool for the subprocess variant.
pub const DEFAULT_PROGRAM: &str = "/usr/bin/doveadm";
/// Default base arguments placed before the user and password.
pub const DEFAULT_ARGS: &[&str] = &["auth", "test", "-a", "/var/run/dovecot/auth-qmail"];

/// Audit sink selected by the environment, `None` when auditing is off.
pub fn audit_sink_from_env() -> Option<Arc<dyn AuditSink>> {
    audit_sink_from(
        env::var_os(AUDIT_ENV).is_some(),
        env::var_os(AUDIT_FILE_ENV).map(PathBuf::from),
    )
}

pub fn audit_sink_from(
    enabled: bool,
    file: Option<PathBuf>,
) -> Option<Arc<dyn AuditSink>> {
    match (enabled, file) {
        (_, Some(path)) => Some(Arc::new(FileAudit::new(path))),
        (true, None) => Some(Arc::new(LogAudit)),
        (false, None) => None,
    }
}

/// Remote peer for audit lines, or the literal placeholder.
pub fn remote_peer() -> String {
    peer_or_default(env::var(PEER_ENV).ok())
}

pub fn peer_or_default(peer: Option<String>) -> String {
    match peer {
        Some(peer) if !peer.is_empty() => peer,
        _ => UNKNOWN_PEER.to_string(),
    }
}

/// LDAP coordinates from the environment. An absent or unparsable port is
/// zero, which the backend rejects before touching the network.
pub fn ldap_settings_from_env() -> LdapSettings {
    ldap_settings_from(
        env::var(LDAP_HOST_ENV).ok(),
        env::var(LDAP_PORT_ENV).ok().as_deref(),
    )
}

pub fn ldap_settings_from(host: Option<String>, port: Option<&str>) -> LdapSettings {
    let port = port.and_then(|p| p.trim().parse().ok()).unwrap_or(0);
    LdapSettings::new(host, port)
}

/// The subprocess backend tool and its base argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessSettings {
    pub program: PathBuf,
    pub base_args: Vec<OsString>,
}

impl SubprocessSettings {
    pub fn from_env() -> Self {
        Self::from_parts(
            env::var_os(PROGRAM_ENV),
            env::var(PROGRAM_ARGS_ENV).ok().as_deref(),
        )
    }

    /// An overridden program with no explicit args runs bare; the default
    /// args only make sense for the default tool.
    pub fn from_parts(program: Option<OsString>, args: Option<&str>) -> Self {
        match (program, args) {
            (None, None) => Self {
                program: PathBuf::from(DEFAULT_PROGRAM),
                base_args: DEFAULT_ARGS.iter().map(OsString::from).collect(),
            },
            (program, args) => Self {
                program: program
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
                base_args: args
                    .unwrap_or("")
                    .split_whitespace()
                    .map(OsString::from)
                    .collect(),
            },
        }
    }
}
