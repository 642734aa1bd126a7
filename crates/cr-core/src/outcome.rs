//! Verification outcomes and the exit-code contract.
//!
//! The exit codes are a stable interface consumed by the invoking mail
//! server's run scripts: a zero status chains into the next pipeline stage,
//! a backend-native status is forwarded verbatim, and the reserved negative
//! constants identify relay-internal failure classes. The caller observes
//! the low 8 bits of a negative code (e.g. `-13` waits as `243`), which is
//! the same truncation the historical C tools exhibited.

/// Reserved exit codes. Backend-native failure codes occupy the positive
/// range and are never remapped.
pub mod exit_code {
    /// Verification succeeded. Only reachable when there is no chain
    /// command to replace the process with.
    pub const SUCCESS: i32 = 0;
    /// The backend executable or service could not be reached.
    pub const BACKEND_UNAVAILABLE: i32 = -10;
    /// Pipe, spawn, or wait machinery failed before an outcome existed.
    pub const FORK_FAILED: i32 = -11;
    /// Process replacement returned instead of replacing the image.
    pub const EXEC_FAILED: i32 = -12;
    /// The credential descriptor was unreadable or empty.
    pub const CRED_UNREADABLE: i32 = -13;
    /// The username or password field was empty after parsing.
    pub const USER_MISSING: i32 = -14;
    /// No terminator was found after the username, so no password field
    /// could be located.
    pub const PASS_UNTERMINATED: i32 = -15;
    /// No terminator was found after the password, so no challenge field
    /// could be located.
    pub const CHALLENGE_UNTERMINATED: i32 = -16;
    /// The mailbox record layout carried no `@domain` suffix.
    pub const DOMAIN_MISSING: i32 = -17;
    /// The backend violated its protocol: subprocess killed by a signal,
    /// library backend misconfigured, or a non-UTF-8 bind identity.
    pub const PROTOCOL_FAILED: i32 = -18;
}

/// The three-valued (plus payload) result of one verification attempt.
///
/// Produced exactly once per invocation by a [`Verifier`] and consumed
/// exactly once when the process finishes.
///
/// [`Verifier`]: crate::backend::Verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The backend accepted the credentials.
    Success,
    /// The backend rejected the credentials or reported an internal error;
    /// the payload is the backend's own status code, forwarded verbatim.
    Failure(i32),
    /// The backend could not be contacted at all.
    BackendUnavailable,
    /// The backend misbehaved or was not usable as configured.
    ProtocolError,
}

impl VerificationOutcome {
    /// The exit code this outcome terminates the relay with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => exit_code::SUCCESS,
            Self::Failure(code) => *code,
            Self::BackendUnavailable => exit_code::BACKEND_UNAVAILABLE,
            Self::ProtocolError => exit_code::PROTOCOL_FAILED,
        }
    }

    /// Whether this outcome allows chaining into the next pipeline stage.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
