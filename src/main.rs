use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

/// `oliver` with no arguments is a no-op. With one argument, the argument
/// is a file path if it exists on disk, otherwise inline source; either
/// way it is parsed, compiled, and evaluated.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Some(argument) = env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match run(&argument) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error during runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(argument: &str) -> Result<(), oliver::Error> {
    let source = if Path::new(argument).exists() {
        fs::read_to_string(argument)?
    } else {
        argument.to_owned()
    };

    oliver::run_source(&source)?;

    Ok(())
}
