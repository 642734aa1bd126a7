//! Verification by an in-process LDAP simple bind.
//!
//! The record's mailbox identity (`user@domain`) is bound against the
//! configured directory server; the server's native result code is the
//! verification verdict. Unlike the subprocess backend, every bind attempt
//! is audited, success or failure -- deployments running this variant have
//! always had the bind verdict in their mail log and depend on it.

use std::sync::Arc;

use ldap3::LdapConn;
use tracing::{debug, warn};

use super::{BackendError, Verifier};
use crate::audit::{AuditEvent, AuditSink};
use crate::credentials::CredentialRecord;
use crate::outcome::VerificationOutcome;
use crate::sanitize::sanitize;

/// Directory server coordinates, normally taken from the environment.
#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Server host; `None` or empty means unconfigured.
    pub host: Option<String>,
    /// Server port; zero means unconfigured.
    pub port: u16,
}

impl LdapSettings {
    pub fn new(host: Option<String>, port: u16) -> Self {
        Self { host, port }
    }
}

/// Binds the record's identity against an LDAP directory.
pub struct LdapBackend {
    settings: LdapSettings,
    peer: String,
    audit: Arc<dyn AuditSink>,
}

impl LdapBackend {
    pub fn new(settings: LdapSettings, peer: String, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            settings,
            peer,
            audit,
        }
    }
}

impl Verifier for LdapBackend {
    fn verify(
        &self,
        record: &CredentialRecord<'_>,
    ) -> Result<VerificationOutcome, BackendError> {
        let host = match self.settings.host.as_deref() {
            Some(host) if !host.is_empty() => host,
            _ => {
                warn!("LDAP host is not configured");
                return Ok(VerificationOutcome::ProtocolError);
            }
        };
        if self.settings.port == 0 {
            warn!("LDAP port is missing or zero");
            return Ok(VerificationOutcome::ProtocolError);
        }
        let domain = match record.domain {
            Some(domain) if !domain.is_empty() => domain,
            _ => {
                warn!("credential record carries no domain");
                return Ok(VerificationOutcome::ProtocolError);
            }
        };

        // Bind identities are strings on the wire; a record that cannot be
        // one is a protocol violation, not a rejection.
        let (Ok(user), Ok(domain), Ok(pass)) = (
            std::str::from_utf8(record.user),
            std::str::from_utf8(domain),
            std::str::from_utf8(record.pass),
        ) else {
            warn!("credential record is not valid UTF-8, cannot form a bind identity");
            return Ok(VerificationOutcome::ProtocolError);
        };

        let url = format!("ldap://{}:{}", host, self.settings.port);
        let identity = format!("{}@{}", user, domain);
        debug!(url = %url, identity = %identity, "binding against LDAP");

        let mut conn = match LdapConn::new(&url) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(url = %url, error = %e, "could not reach the LDAP server");
                return Ok(VerificationOutcome::BackendUnavailable);
            }
        };

        match conn.simple_bind(&identity, pass) {
            Ok(res) if res.rc == 0 => {
                self.audit.record(&AuditEvent::new(
                    format!("auth succeeded for {}", identity),
                    self.peer.clone(),
                ));
                // The verdict is already fixed by the bind; a failed release
                // is only worth a diagnostic.
                if let Err(e) = conn.unbind() {
                    warn!(error = %e, "LDAP unbind failed");
                }
                Ok(VerificationOutcome::Success)
            }
            Ok(res) => {
                self.audit.record(&AuditEvent::new(
                    format!(
                        "auth failed for {} rc={} {}",
                        identity,
                        res.rc,
                        sanitize(res.text.as_bytes()).trim()
                    ),
                    self.peer.clone(),
                ));
                Ok(VerificationOutcome::Failure(res.rc as i32))
            }
            Err(e) => {
                warn!(error = %e, "LDAP bind did not complete");
                self.audit.record(&AuditEvent::new(
                    format!("auth error for {}", identity),
                    self.peer.clone(),
                ));
                Ok(VerificationOutcome::BackendUnavailable)
            }
        }
    }
}
