//! Writing wrapper scripts from a flat list of command-line options.

use crate::error::WrapperError;
use crate::lexer::join_fields;
use log::info;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
enum OptionKind {
    /// Emits the directive named like the option, taking this many values.
    Directive(usize),
    /// `--arg VALUE`
    Arg,
    /// `--args COUNT VALUE...`
    Args,
}

const OPTIONS: &[(&str, OptionKind)] = &[
    ("--set", OptionKind::Directive(2)),
    ("--set-default", OptionKind::Directive(2)),
    ("--unset", OptionKind::Directive(1)),
    ("--prefix", OptionKind::Directive(3)),
    ("--suffix", OptionKind::Directive(3)),
    ("--cd", OptionKind::Directive(1)),
    ("--argv0", OptionKind::Directive(1)),
    ("--argv0-wrapper", OptionKind::Directive(0)),
    ("--argv0-wrapped", OptionKind::Directive(0)),
    ("--arg", OptionKind::Arg),
    ("--args", OptionKind::Args),
];

/// Take `n` values following `option`, or fail if there are fewer left.
fn take_values<'a>(
    option: &str,
    rest: &mut &'a [OsString],
    n: usize,
) -> Result<&'a [OsString], WrapperError> {
    if rest.len() < n {
        return Err(WrapperError::TooFewOptionArguments {
            option: option.to_owned(),
        });
    }
    let (values, remaining) = rest.split_at(n);
    *rest = remaining;
    Ok(values)
}

fn write_line<W: Write>(out: &mut W, line: &OsStr) -> io::Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\n")
}

/// Write a complete wrapper script to `out`.
///
/// `io_error` turns a write failure into the error reported to the caller.
fn write_wrapper<W: Write>(
    out: &mut W,
    wrapper_path: &OsStr,
    exec_path: &OsStr,
    options: &[OsString],
    io_error: impl Fn(io::Error) -> WrapperError,
) -> Result<(), WrapperError> {
    let mut header = OsString::from("#! ");
    header.push(wrapper_path);
    write_line(out, &header).map_err(&io_error)?;

    let mut add_args: Vec<&OsStr> = Vec::new();
    let mut rest = options;
    while let Some((option, tail)) = rest.split_first() {
        rest = tail;
        let (option, kind) = OPTIONS
            .iter()
            .find(|(name, _)| option.as_bytes() == name.as_bytes())
            .copied()
            .ok_or_else(|| WrapperError::InvalidOption {
                option: option.to_string_lossy().into_owned(),
            })?;

        match kind {
            OptionKind::Directive(arity) => {
                let values = take_values(option, &mut rest, arity)?;
                let command = option.trim_start_matches("--");
                write_line(out, &join_fields(command, values)).map_err(&io_error)?;
            }
            OptionKind::Arg => {
                let value = &take_values(option, &mut rest, 1)?[0];
                add_args.push(value);
            }
            OptionKind::Args => {
                let count = &take_values(option, &mut rest, 1)?[0];
                let count = count
                    .to_str()
                    .and_then(|count| count.parse::<usize>().ok())
                    .ok_or_else(|| WrapperError::InvalidArgCount {
                        option: option.to_owned(),
                        count: count.to_string_lossy().into_owned(),
                    })?;
                let values = take_values(option, &mut rest, count)?;
                add_args.extend(values.iter().map(OsString::as_os_str));
            }
        }
    }

    if !add_args.is_empty() {
        write_line(out, &join_fields("add-args", &add_args)).map_err(&io_error)?;
    }
    write_line(out, &join_fields("exec", &[exec_path])).map_err(&io_error)?;
    Ok(())
}

/// Flush a written file down to the device. Pipes and character devices
/// cannot be synced, which is not a failure.
fn sync(file: &File) -> io::Result<()> {
    match file.sync_all() {
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
        result => result,
    }
}

/// Generate a wrapper script at `output`.
///
/// The script starts with a `#!` line naming `wrapper_path`, then one line per
/// directive option in the order given, then a single `add-args` line with
/// everything collected from `--arg`/`--args`, and finally `exec exec_path`.
pub fn make_wrapper(
    output: &Path,
    wrapper_path: &OsStr,
    exec_path: &OsStr,
    options: &[OsString],
) -> Result<(), WrapperError> {
    let write_error = |source: io::Error| WrapperError::Write {
        path: output.to_path_buf(),
        source,
    };

    let file = File::create(output).map_err(|source| WrapperError::Open {
        path: output.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    write_wrapper(&mut out, wrapper_path, exec_path, options, write_error)?;

    let file = out
        .into_inner()
        .map_err(|err| write_error(err.into_error()))?;
    sync(&file).map_err(write_error)?;
    info!(
        "wrote wrapper {} for {}",
        output.display(),
        Path::new(exec_path).display()
    );
    Ok(())
}
