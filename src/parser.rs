//! Mapping of tokenized script lines to [`Directive`]s.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use thiserror::Error;

/// One parsed command of a wrapper script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `set NAME VALUE`: unconditional assignment.
    Set { name: OsString, value: OsString },
    /// `set-default NAME VALUE`: assignment only when the variable is unset.
    SetDefault { name: OsString, value: OsString },
    /// `unset NAME`
    Unset { name: OsString },
    /// `prefix NAME SEP VALUE`: merge `value` in front of the current list.
    Prefix {
        name: OsString,
        separator: u8,
        value: OsString,
    },
    /// `suffix NAME SEP VALUE`: merge `value` behind the current list.
    Suffix {
        name: OsString,
        separator: u8,
        value: OsString,
    },
    /// `cd PATH`
    Cd { path: PathBuf },
    /// `argv0 VALUE`: custom argv[0] for the wrapped program.
    Argv0 { value: OsString },
    /// `argv0-wrapper`: the script's own path becomes argv[0].
    Argv0Wrapper,
    /// `argv0-wrapped`: the executed path becomes argv[0].
    Argv0Wrapped,
    /// `exec PATH`: the program that replaces this process.
    Exec { path: OsString },
    /// `add-args ARG...`: arguments placed before the caller's arguments.
    AddArgs(Vec<OsString>),
}

/// Errors tied to a single line of a script.
#[derive(Debug, Error)]
pub enum LineError {
    #[error(transparent)]
    Lexing(#[from] crate::lexer::LexingError),
    #[error("Invalid command: \"{0}\"")]
    InvalidCommand(String),
    #[error("Invalid number of parameters to \"{0}\" command.")]
    InvalidParamCount(String),
    #[error("Separator must be one character.")]
    SeparatorLength,
    #[error("Failed to set environment variable \"{name}\": {source}")]
    SetVar {
        name: String,
        source: crate::env::EnvError,
    },
    #[error("Failed to unset environment variable \"{name}\": {source}")]
    UnsetVar {
        name: String,
        source: crate::env::EnvError,
    },
    #[error("Failed to change directory to \"{}\": {source}", .path.display())]
    ChangeDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exact(usize),
    Any,
}

type Build = fn(Vec<OsString>) -> Result<Directive, LineError>;

/// Known commands: name, number of parameters after the name, constructor.
/// The constructor receives exactly the parameters, already arity-checked.
const COMMANDS: &[(&str, Arity, Build)] = &[
    ("set", Arity::Exact(2), |p| {
        let [name, value] = take::<2>(p);
        Ok(Directive::Set { name, value })
    }),
    ("set-default", Arity::Exact(2), |p| {
        let [name, value] = take::<2>(p);
        Ok(Directive::SetDefault { name, value })
    }),
    ("unset", Arity::Exact(1), |p| {
        let [name] = take::<1>(p);
        Ok(Directive::Unset { name })
    }),
    ("prefix", Arity::Exact(3), |p| {
        let [name, separator, value] = take::<3>(p);
        let separator = single_byte(&separator)?;
        Ok(Directive::Prefix {
            name,
            separator,
            value,
        })
    }),
    ("suffix", Arity::Exact(3), |p| {
        let [name, separator, value] = take::<3>(p);
        let separator = single_byte(&separator)?;
        Ok(Directive::Suffix {
            name,
            separator,
            value,
        })
    }),
    ("cd", Arity::Exact(1), |p| {
        let [path] = take::<1>(p);
        Ok(Directive::Cd {
            path: PathBuf::from(path),
        })
    }),
    ("argv0", Arity::Exact(1), |p| {
        let [value] = take::<1>(p);
        Ok(Directive::Argv0 { value })
    }),
    ("argv0-wrapper", Arity::Exact(0), |_| Ok(Directive::Argv0Wrapper)),
    ("argv0-wrapped", Arity::Exact(0), |_| Ok(Directive::Argv0Wrapped)),
    ("exec", Arity::Exact(1), |p| {
        let [path] = take::<1>(p);
        Ok(Directive::Exec { path })
    }),
    ("add-args", Arity::Any, |p| Ok(Directive::AddArgs(p))),
];

fn take<const N: usize>(params: Vec<OsString>) -> [OsString; N] {
    let mut params = params.into_iter();
    std::array::from_fn(|_| params.next().unwrap_or_default())
}

/// List separators are single bytes.
fn single_byte(s: &OsStr) -> Result<u8, LineError> {
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(LineError::SeparatorLength),
    }
}

/// Build a directive from the fields of one line.
///
/// Returns `Ok(None)` for an empty field list, i.e. a blank or comment line.
pub fn parse_directive(fields: Vec<OsString>) -> Result<Option<Directive>, LineError> {
    let mut fields = fields.into_iter();
    let Some(cmd) = fields.next() else {
        return Ok(None);
    };
    let params: Vec<OsString> = fields.collect();

    let (name, arity, build) = COMMANDS
        .iter()
        .find(|(name, _, _)| cmd.as_bytes() == name.as_bytes())
        .ok_or_else(|| LineError::InvalidCommand(cmd.to_string_lossy().into_owned()))?;

    if let Arity::Exact(n) = arity {
        if params.len() != *n {
            return Err(LineError::InvalidParamCount(name.to_string()));
        }
    }
    build(params).map(Some)
}

/// Tokenize and parse one script line, given without its newline.
pub fn parse_line(line: &[u8]) -> Result<Option<Directive>, LineError> {
    parse_directive(crate::lexer::split_into_fields(line)?)
}
