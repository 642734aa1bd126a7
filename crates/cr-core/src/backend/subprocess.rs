//! Verification by supervising an external backend tool.
//!
//! The tool's stdout and stderr are funneled through one pipe back to the
//! relay, drained to EOF, and its exit status becomes the verification
//! outcome: zero is success, any other normally-reported status is the
//! backend's own failure code and is forwarded verbatim.

use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use tracing::{debug, warn};

use super::{BackendError, Verifier};
use crate::audit::{AuditEvent, AuditSink};
use crate::credentials::CredentialRecord;
use crate::outcome::VerificationOutcome;
use crate::sanitize::sanitize_backend_output;

/// Supervises one invocation of an external verifier binary.
///
/// The username and password are appended to the configured base arguments
/// as literal argv entries. That keeps the backend tool's own argv syntax
/// out of this component, but it also means the secrets are visible in the
/// process table until the tool scrubs them; a hardened deployment should
/// switch to a tool that reads credentials from stdin.
pub struct SubprocessBackend {
    program: PathBuf,
    base_args: Vec<OsString>,
    peer: String,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SubprocessBackend {
    /// `audit` of `None` disables the audit path entirely: the child's
    /// output is still drained (a full pipe must never stall termination)
    /// but nothing is sanitized or recorded.
    pub fn new(
        program: PathBuf,
        base_args: Vec<OsString>,
        peer: String,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        Self {
            program,
            base_args,
            peer,
            audit,
        }
    }
}

impl Verifier for SubprocessBackend {
    fn verify(
        &self,
        record: &CredentialRecord<'_>,
    ) -> Result<VerificationOutcome, BackendError> {
        if !self.program.exists() {
            warn!(program = %self.program.display(), "backend program does not exist");
            return Ok(VerificationOutcome::BackendUnavailable);
        }

        // Close-on-exec keeps the raw pipe ends out of the child's
        // descriptor table; it only sees the dup2'd stdout/stderr copies.
        // An inherited write end in a backend-spawned grandchild would
        // otherwise hold off EOF on the drain below indefinitely.
        let (pipe_rx, pipe_tx) =
            pipe2(OFlag::O_CLOEXEC).map_err(|e| BackendError::Pipe(e.into()))?;
        let pipe_tx_err = pipe_tx.try_clone().map_err(BackendError::Pipe)?;

        // The Command retains its Stdio handles for potential respawns, so
        // it must be dropped before draining: a write end still open in the
        // parent would keep EOF from ever arriving.
        let spawned = {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.base_args)
                .arg(os_arg(record.user))
                .arg(os_arg(record.pass))
                .stdin(Stdio::null())
                .stdout(Stdio::from(pipe_tx))
                .stderr(Stdio::from(pipe_tx_err));
            cmd.spawn()
        };

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(program = %self.program.display(), "backend program vanished before spawn");
                return Ok(VerificationOutcome::BackendUnavailable);
            }
            Err(e) => return Err(BackendError::Spawn(e)),
        };

        // Drain the combined output to EOF before waiting; a child that
        // out-writes the kernel pipe buffer would otherwise block forever
        // against our wait.
        let mut output = Vec::new();
        if let Err(e) = File::from(pipe_rx).read_to_end(&mut output) {
            warn!(error = %e, "error draining backend output");
        }

        if let Some(audit) = &self.audit {
            let detail = sanitize_backend_output(&output);
            audit.record(&AuditEvent::new(detail, self.peer.clone()));
        }

        let status = child.wait().map_err(BackendError::Wait)?;
        debug!(?status, "backend process finished");

        match status.code() {
            Some(0) => Ok(VerificationOutcome::Success),
            Some(code) => Ok(VerificationOutcome::Failure(code)),
            None => {
                warn!(?status, "backend process killed by a signal");
                Ok(VerificationOutcome::ProtocolError)
            }
        }
    }
}

/// Credential bytes as a literal argv entry, no UTF-8 requirement.
fn os_arg(bytes: &[u8]) -> OsString {
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}
