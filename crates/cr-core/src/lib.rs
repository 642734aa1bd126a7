//! Credential relay for a mail server's connection pipeline.
//!
//! A relay binary is handed a pre-opened descriptor carrying one
//! NUL-delimited credential record, verifies it against a pluggable
//! identity backend, optionally emits one sanitized audit line, and then
//! either terminates with a contract exit code or replaces its own process
//! image with the next pipeline stage.
//!
//! The pieces, leaves first:
//!
//! - [`credentials`] -- the record buffer and its two parse layouts,
//! - [`sanitize`] -- printable-ASCII scrubbing of backend chatter,
//! - [`outcome`] -- the verification outcome and the exit-code catalog,
//! - [`audit`] -- the per-attempt audit event and its sinks,
//! - [`backend`] -- the subprocess and LDAP verifiers,
//! - [`chain`] -- process replacement into the next stage,
//! - [`config`] -- environment plumbing,
//! - [`driver`] -- the parse/verify/decide sequence.

pub mod audit;
pub mod backend;
pub mod chain;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod outcome;
pub mod sanitize;

pub use backend::Verifier;
pub use chain::{finish, ChainCommand, RunOutcome};
pub use credentials::{acquire_credentials, CredentialRecord, CREDENTIAL_FD};
pub use driver::Driver;
pub use outcome::VerificationOutcome;
