//! Entry point for the switchboard daemon.

use std::process::ExitCode;

use switchboardd::LaunchError;

fn main() -> ExitCode {
    match switchboardd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "telemetry may not be installed yet")]
fn report(error: &LaunchError) {
    eprintln!("switchboardd: {error}");
}
