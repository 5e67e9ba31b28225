use std::process::ExitCode;

use blobperf_core::ProcessEnv;
use clap::Parser;

mod cli;
mod commands;
mod logging;

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match cli::rejection_code(&e) {
            Some(code) => {
                let _ = e.print();
                return ExitCode::from(code);
            }
            None => e.exit(),
        },
    };
    let dispatch = logging::dispatch(cli.verbose);
    let code = tracing::dispatcher::with_default(&dispatch, || {
        let stdout = std::io::stdout();
        commands::run_command(cli, &ProcessEnv, &mut stdout.lock())
    });
    ExitCode::from(code)
}
