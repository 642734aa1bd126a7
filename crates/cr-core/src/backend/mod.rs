//! Pluggable identity backends.
//!
//! A backend is an opaque `verify(record) -> outcome` collaborator; the
//! relay never speaks the backend's wire protocol itself. Two concrete
//! backends exist: a supervised subprocess tool and an in-process LDAP
//! bind. The concrete backend is selected by the binary, not by runtime
//! dispatch on the record.

mod ldap;
mod subprocess;

pub use ldap::{LdapBackend, LdapSettings};
pub use subprocess::SubprocessBackend;

use thiserror::Error;

use crate::credentials::CredentialRecord;
use crate::outcome::{exit_code, VerificationOutcome};

/// Environment failures inside a backend, before any verification verdict
/// exists. These terminate the relay with a reserved code; they are not
/// verification outcomes.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to create the output pipe: {0}")]
    Pipe(std::io::Error),

    #[error("failed to spawn the backend process: {0}")]
    Spawn(std::io::Error),

    #[error("failed to collect the backend process: {0}")]
    Wait(std::io::Error),
}

impl BackendError {
    /// The exit code reported for this environment failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pipe(_) | Self::Spawn(_) | Self::Wait(_) => exit_code::FORK_FAILED,
        }
    }
}

/// One verification attempt against an identity backend.
///
/// Exactly one attempt per call; no implicit retries. A backend may emit at
/// most one audit event as a side effect.
pub trait Verifier {
    fn verify(&self, record: &CredentialRecord<'_>)
        -> Result<VerificationOutcome, BackendError>;
}
