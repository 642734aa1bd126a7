//! Hand-off to the next pipeline stage.
//!
//! On success the relay does not spawn the next stage -- it becomes it,
//! replacing its own process image while keeping the process identity, the
//! descriptor table, and the environment the mail server set up. The
//! control flow is modeled explicitly as a [`RunOutcome`] so that the
//! irreversible replacement is one visible final step instead of a call
//! that conventionally never returns.

use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::process::Command;

use tracing::error;

use crate::outcome::exit_code;

/// The rest of the relay's own argv, forwarded verbatim. Never inspected,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCommand {
    argv: Vec<OsString>,
}

impl ChainCommand {
    /// Everything after the relay's own argv[0].
    pub fn from_env() -> Self {
        Self {
            argv: std::env::args_os().skip(1).collect(),
        }
    }

    pub fn new(argv: Vec<OsString>) -> Self {
        Self { argv }
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    /// Replace the current process image with the chain command, inheriting
    /// environment and descriptors. Returns only on failure.
    fn exec(&self) -> std::io::Error {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        cmd.exec()
    }
}

/// What one invocation of the relay amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Verification succeeded; become the next pipeline stage.
    Chain(ChainCommand),
    /// Terminate immediately with this exit code.
    Terminate(i32),
}

/// Carry out the outcome. Never returns.
///
/// Callers must have flushed every logging side effect first: after a
/// successful replacement no code in this process runs again. An exec that
/// returns is itself fatal and reported with the dedicated exec-failure
/// code.
pub fn finish(outcome: RunOutcome) -> ! {
    match outcome {
        RunOutcome::Terminate(code) => std::process::exit(code),
        RunOutcome::Chain(cmd) => {
            if cmd.is_empty() {
                // Nothing to chain into; report plain success.
                std::process::exit(exit_code::SUCCESS);
            }
            let e = cmd.exec();
            error!(error = %e, argv = ?cmd.argv(), "process replacement failed");
            std::process::exit(exit_code::EXEC_FAILED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_command_preserves_argv_order() {
        let cmd = ChainCommand::new(vec![
            OsString::from("/var/qmail/bin/qmail-smtpd"),
            OsString::from("example.com"),
            OsString::from("--"),
        ]);
        assert!(!cmd.is_empty());
        assert_eq!(
            cmd.argv(),
            &[
                OsString::from("/var/qmail/bin/qmail-smtpd"),
                OsString::from("example.com"),
                OsString::from("--"),
            ]
        );
    }

    #[test]
    fn test_empty_chain() {
        assert!(ChainCommand::new(Vec::new()).is_empty());
    }
}
