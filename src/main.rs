// src/main.rs

use std::process::ExitCode;

use tupledag::{cli, logging, run};

fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("tupledag: {err:?}");
        return ExitCode::FAILURE;
    }
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "replay aborted");
            eprintln!("tupledag: {err:?}");
            ExitCode::FAILURE
        }
    }
}
