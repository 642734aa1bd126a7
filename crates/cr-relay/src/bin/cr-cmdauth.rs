//! Subprocess-backend credential relay.
//!
//! Reads the credential record from fd 3, verifies it by running the
//! configured backend tool (doveadm by default), and on success execs the
//! rest of its own argv as the next pipeline stage. Intended as a drop-in
//! checkpassword-style stage in a mail server's run script.

use tracing::error;

use cr_core::backend::SubprocessBackend;
use cr_core::chain::{finish, ChainCommand, RunOutcome};
use cr_core::config;
use cr_core::credentials::{acquire_credentials, PlainLayout, CREDENTIAL_FD};
use cr_core::driver::Driver;

fn main() {
    cr_relay::init_logging();

    let chain = ChainCommand::from_env();

    // The descriptor is consumed and closed here, before the backend child
    // exists, so it cannot leak across the spawn.
    let buffer = match acquire_credentials(CREDENTIAL_FD) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!(error = %e, "cannot read credential record");
            finish(RunOutcome::Terminate(e.exit_code()));
        }
    };

    let settings = config::SubprocessSettings::from_env();
    let backend = SubprocessBackend::new(
        settings.program,
        settings.base_args,
        config::remote_peer(),
        config::audit_sink_from_env(),
    );

    let driver = Driver::new(&PlainLayout, &backend);
    finish(driver.run(&buffer, chain));
}
