//! LDAP-backend credential relay.
//!
//! Reads a mailbox-layout credential record (`user@domain`) from fd 3,
//! binds the identity against the directory server named by `LDAP_HOST` /
//! `LDAP_PORT`, and on success execs the rest of its own argv as the next
//! pipeline stage.

use std::sync::Arc;

use tracing::error;

use cr_core::audit::LogAudit;
use cr_core::backend::LdapBackend;
use cr_core::chain::{finish, ChainCommand, RunOutcome};
use cr_core::config;
use cr_core::credentials::{acquire_credentials, MailboxLayout, CREDENTIAL_FD};
use cr_core::driver::Driver;

fn main() {
    cr_relay::init_logging();

    let chain = ChainCommand::from_env();

    let buffer = match acquire_credentials(CREDENTIAL_FD) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!(error = %e, "cannot read credential record");
            finish(RunOutcome::Terminate(e.exit_code()));
        }
    };

    // This variant always audits its bind verdicts; the env toggle only
    // chooses the sink.
    let audit = config::audit_sink_from_env().unwrap_or_else(|| Arc::new(LogAudit));
    let backend = LdapBackend::new(
        config::ldap_settings_from_env(),
        config::remote_peer(),
        audit,
    );

    let driver = Driver::new(&MailboxLayout, &backend);
    finish(driver.run(&buffer, chain));
}
