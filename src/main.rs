use anyhow::Result;
use env_logger::Env;
use program_wrapper::{WrapperError, make_wrapper, run_wrapper};
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

const ERROR_PREFIX: &str = "program-wrapper: ";
const MAKE_ERROR_PREFIX: &str = "program-wrapper --make-wrapper: ";

/// `program-wrapper <script> [arg...]` runs a wrapper script.
/// `program-wrapper --make-wrapper <output> <wrapper> <exec> [option...]`
/// writes one.
///
/// Arguments are passed on as raw bytes; none of them has to be UTF-8.
fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::new().filter_or("PROGRAM_WRAPPER_LOG", "warn")).init();

    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let (prefix, result) = if args.first().is_some_and(|arg| arg == "--make-wrapper") {
        (MAKE_ERROR_PREFIX, generate(&args[1..]))
    } else {
        (ERROR_PREFIX, interpret(args))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Library errors already spell out their cause.
            eprintln!("{prefix}{err}");
            ExitCode::FAILURE
        }
    }
}

fn interpret(args: Vec<OsString>) -> Result<()> {
    let mut args = args.into_iter();
    let script = args.next().ok_or(WrapperError::TooFewArguments)?;
    let never = run_wrapper(&script, args.collect())?;
    match never {}
}

fn generate(args: &[OsString]) -> Result<()> {
    let [output, wrapper, exec, options @ ..] = args else {
        return Err(WrapperError::TooFewArguments.into());
    };
    make_wrapper(Path::new(output), wrapper, exec, options)?;
    Ok(())
}
