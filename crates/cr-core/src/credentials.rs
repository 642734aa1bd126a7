//! Reading and parsing of the credential record handed over on fd 3.
//!
//! The mail server writes one record of up to [`CREDENTIAL_LIMIT`] bytes in
//! a single `write`, laid out as `user NUL pass NUL challenge`, the final
//! terminator optional. Mailbox-style deployments embed the domain in the
//! user field as `user@domain`; that is a distinct record layout with its
//! own parse strategy, not a tolerated variation of the plain one.
//!
//! The record lives in one owned buffer for the duration of the invocation;
//! the parsed fields are borrowed slices into it and are never copied or
//! persisted.

use std::fs::File;
use std::io::Read;
use std::os::fd::{FromRawFd, RawFd};

use thiserror::Error;
use tracing::debug;

use crate::outcome::exit_code;

/// The descriptor the invoking mail server pre-opens with the record.
pub const CREDENTIAL_FD: RawFd = 3;

/// Upper bound on the credential record size. A single read of at most this
/// many bytes is treated as the complete record.
pub const CREDENTIAL_LIMIT: usize = 1000;

/// Errors producing a client-caused failure exit. No backend is contacted
/// once any of these occurs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("credential descriptor was empty or unreadable")]
    Unreadable,

    #[error("username or password field is empty")]
    EmptyUserOrPass,

    #[error("no terminator after the username; password field missing")]
    PassUnterminated,

    #[error("no terminator after the password; challenge field missing")]
    ChallengeUnterminated,

    #[error("no @domain suffix in the username field")]
    DomainMissing,
}

impl ParseError {
    /// The exit code reported for this parse failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreadable => exit_code::CRED_UNREADABLE,
            Self::EmptyUserOrPass => exit_code::USER_MISSING,
            Self::PassUnterminated => exit_code::PASS_UNTERMINATED,
            Self::ChallengeUnterminated => exit_code::CHALLENGE_UNTERMINATED,
            Self::DomainMissing => exit_code::DOMAIN_MISSING,
        }
    }
}

/// The raw record bytes, owned for the lifetime of one invocation.
#[derive(Debug)]
pub struct CredentialBuffer {
    buf: [u8; CREDENTIAL_LIMIT],
    len: usize,
}

impl CredentialBuffer {
    /// The bytes actually read from the descriptor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Read the credential record with a single `read` call.
///
/// A short read is the complete record; the producer's framing convention
/// is one `write` per record, so this never loops to fill the buffer.
/// Nothing read, or a read error, is [`ParseError::Unreadable`].
pub fn read_credentials(reader: &mut impl Read) -> Result<CredentialBuffer, ParseError> {
    let mut buf = [0u8; CREDENTIAL_LIMIT];
    match reader.read(&mut buf) {
        Ok(0) | Err(_) => Err(ParseError::Unreadable),
        Ok(len) => {
            debug!(len, "read credential record");
            Ok(CredentialBuffer { buf, len })
        }
    }
}

/// Take ownership of the pre-opened credential descriptor, read the record,
/// and close the descriptor immediately -- before any verification runs, so
/// it cannot leak into a backend subprocess.
///
/// Must be called at most once per process, while `fd` is still the open
/// descriptor inherited from the mail server.
pub fn acquire_credentials(fd: RawFd) -> Result<CredentialBuffer, ParseError> {
    // SAFETY: the caller guarantees `fd` is open and not owned elsewhere in
    // this process; the File takes ownership and closes it on drop.
    let mut file = unsafe { File::from_raw_fd(fd) };
    let result = read_credentials(&mut file);
    drop(file);
    result
}

/// One parsed record. Fields borrow from the [`CredentialBuffer`];
/// `domain` is populated only by [`MailboxLayout`].
#[derive(Debug, PartialEq, Eq)]
pub struct CredentialRecord<'a> {
    pub user: &'a [u8],
    pub domain: Option<&'a [u8]>,
    pub pass: &'a [u8],
    pub challenge: &'a [u8],
}

/// A concrete record layout. Each layout fails deterministically on a
/// malformed record rather than guessing field boundaries.
pub trait RecordLayout {
    fn parse<'a>(&self, buffer: &'a CredentialBuffer) -> Result<CredentialRecord<'a>, ParseError>;
}

/// `user NUL pass NUL challenge [NUL]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLayout;

impl RecordLayout for PlainLayout {
    fn parse<'a>(&self, buffer: &'a CredentialBuffer) -> Result<CredentialRecord<'a>, ParseError> {
        let (user, pass, challenge) = split_fields(buffer.as_bytes())?;
        if user.is_empty() || pass.is_empty() {
            return Err(ParseError::EmptyUserOrPass);
        }
        Ok(CredentialRecord {
            user,
            domain: None,
            pass,
            challenge,
        })
    }
}

/// `user@domain NUL pass NUL challenge [NUL]`. The `@` split happens before
/// the pass/challenge split.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailboxLayout;

impl RecordLayout for MailboxLayout {
    fn parse<'a>(&self, buffer: &'a CredentialBuffer) -> Result<CredentialRecord<'a>, ParseError> {
        let (mailbox, pass, challenge) = split_fields(buffer.as_bytes())?;
        let at = mailbox
            .iter()
            .position(|&b| b == b'@')
            .ok_or(ParseError::DomainMissing)?;
        let (user, domain) = (&mailbox[..at], &mailbox[at + 1..]);
        if domain.is_empty() {
            return Err(ParseError::DomainMissing);
        }
        if user.is_empty() || pass.is_empty() {
            return Err(ParseError::EmptyUserOrPass);
        }
        Ok(CredentialRecord {
            user,
            domain: Some(domain),
            pass,
            challenge,
        })
    }
}

/// Locate the two mandatory NUL separators. The challenge's own trailing
/// terminator is optional; anything after it would be producer garbage and
/// is not part of the record.
fn split_fields(bytes: &[u8]) -> Result<(&[u8], &[u8], &[u8]), ParseError> {
    let (first, rest) = split_nul(bytes).ok_or(ParseError::PassUnterminated)?;
    let (pass, rest) = split_nul(rest).ok_or(ParseError::ChallengeUnterminated)?;
    let challenge = match split_nul(rest) {
        Some((challenge, _)) => challenge,
        None => rest,
    };
    Ok((first, pass, challenge))
}

/// Split at the first NUL, returning the field and the remainder after it.
fn split_nul(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|&b| b == 0)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}
