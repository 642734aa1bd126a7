//! Sequencing of one relay invocation.
//!
//! Parse, verify, decide. The driver owns nothing beyond the borrowed
//! layout and verifier; the credential buffer and chain command pass
//! through it exactly once.

use tracing::{debug, error};

use crate::backend::Verifier;
use crate::chain::{ChainCommand, RunOutcome};
use crate::credentials::{CredentialBuffer, RecordLayout};

pub struct Driver<'a> {
    layout: &'a dyn RecordLayout,
    verifier: &'a dyn Verifier,
}

impl<'a> Driver<'a> {
    pub fn new(layout: &'a dyn RecordLayout, verifier: &'a dyn Verifier) -> Self {
        Self { layout, verifier }
    }

    /// One verification attempt. A malformed record terminates with its
    /// parse code before any backend is contacted; only a successful
    /// verification yields the chain command back.
    pub fn run(&self, buffer: &CredentialBuffer, chain: ChainCommand) -> RunOutcome {
        let record = match self.layout.parse(buffer) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "malformed credential record");
                return RunOutcome::Terminate(e.exit_code());
            }
        };

        let outcome = match self.verifier.verify(&record) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "backend machinery failed");
                return RunOutcome::Terminate(e.exit_code());
            }
        };
        debug!(?outcome, "verification finished");

        if outcome.is_success() {
            RunOutcome::Chain(chain)
        } else {
            RunOutcome::Terminate(outcome.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::credentials::{read_credentials, CredentialRecord, ParseError, PlainLayout};
    use crate::outcome::{exit_code, VerificationOutcome};

    /// Verifier that returns a fixed outcome and counts invocations.
    struct StaticVerifier {
        outcome: VerificationOutcome,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl StaticVerifier {
        fn new(outcome: VerificationOutcome) -> Self {
            Self {
                outcome,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl Verifier for StaticVerifier {
        fn verify(
            &self,
            _record: &CredentialRecord<'_>,
        ) -> Result<VerificationOutcome, BackendError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(self.outcome)
        }
    }

    fn buffer(record: &[u8]) -> CredentialBuffer {
        read_credentials(&mut std::io::Cursor::new(record)).unwrap()
    }

    fn chain() -> ChainCommand {
        ChainCommand::new(vec!["/bin/true".into()])
    }

    #[test]
    fn test_success_yields_untouched_chain() {
        let verifier = StaticVerifier::new(VerificationOutcome::Success);
        let driver = Driver::new(&PlainLayout, &verifier);
        let outcome = driver.run(&buffer(b"alice\0pw\0\0"), chain());
        assert_eq!(outcome, RunOutcome::Chain(chain()));
        assert_eq!(verifier.calls(), 1);
    }

    #[test]
    fn test_failure_terminates_with_backend_code() {
        let verifier = StaticVerifier::new(VerificationOutcome::Failure(49));
        let driver = Driver::new(&PlainLayout, &verifier);
        assert_eq!(
            driver.run(&buffer(b"alice\0pw\0\0"), chain()),
            RunOutcome::Terminate(49)
        );
    }

    #[test]
    fn test_unavailable_backend_terminates() {
        let verifier = StaticVerifier::new(VerificationOutcome::BackendUnavailable);
        let driver = Driver::new(&PlainLayout, &verifier);
        assert_eq!(
            driver.run(&buffer(b"alice\0pw\0\0"), chain()),
            RunOutcome::Terminate(exit_code::BACKEND_UNAVAILABLE)
        );
    }

    #[test]
    fn test_malformed_record_never_reaches_backend() {
        let verifier = StaticVerifier::new(VerificationOutcome::Success);
        let driver = Driver::new(&PlainLayout, &verifier);
        let outcome = driver.run(&buffer(b"alice"), chain());
        assert_eq!(
            outcome,
            RunOutcome::Terminate(ParseError::PassUnterminated.exit_code())
        );
        assert_eq!(verifier.calls(), 0);
    }

    #[test]
    fn test_backend_machinery_failure_code() {
        struct Broken;
        impl Verifier for Broken {
            fn verify(
                &self,
                _record: &CredentialRecord<'_>,
            ) -> Result<VerificationOutcome, BackendError> {
                Err(BackendError::Spawn(std::io::Error::other("no processes")))
            }
        }
        let driver = Driver::new(&PlainLayout, &Broken);
        assert_eq!(
            driver.run(&buffer(b"alice\0pw\0\0"), chain()),
            RunOutcome::Terminate(exit_code::FORK_FAILED)
        );
    }
}
