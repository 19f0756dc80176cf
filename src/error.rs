use crate::parser::LineError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`WrapperError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening, reading or writing a file, or changing directory.
    Io,
    /// Malformed script or generator options.
    Parse,
    /// Setting or removing an environment variable.
    Env,
    /// Replacing the process image.
    Exec,
}

/// Errors reported by the interpreter and the generator.
///
/// All of them are fatal. The display form is the diagnostic printed after
/// the program prefix.
#[derive(Debug, Error)]
pub enum WrapperError {
    #[error("Too few arguments passed.")]
    TooFewArguments,
    #[error("{}: Failed to open file: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("{}: failed to read from file: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{}: failed to write to file: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("{}: line {line}: {error}", .path.display())]
    Line {
        path: PathBuf,
        line: usize,
        error: LineError,
    },
    #[error("{}: No exec command in file.", .path.display())]
    NoExec { path: PathBuf },
    #[error("Failed to execute \"{}\": {source}", .path.display())]
    Exec { path: PathBuf, source: io::Error },
    #[error("{option}: Too few arguments.")]
    TooFewOptionArguments { option: String },
    #[error("{option}: Invalid argument count \"{count}\".")]
    InvalidArgCount { option: String, count: String },
    #[error("{option}: Invalid option.")]
    InvalidOption { option: String },
}

impl WrapperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WrapperError::Open { .. } | WrapperError::Read { .. } | WrapperError::Write { .. } => {
                ErrorKind::Io
            }
            WrapperError::Line { error, .. } => match error {
                LineError::SetVar { .. } | LineError::UnsetVar { .. } => ErrorKind::Env,
                LineError::ChangeDir { .. } => ErrorKind::Io,
                _ => ErrorKind::Parse,
            },
            WrapperError::Exec { .. } => ErrorKind::Exec,
            WrapperError::TooFewArguments
            | WrapperError::NoExec { .. }
            | WrapperError::TooFewOptionArguments { .. }
            | WrapperError::InvalidArgCount { .. }
            | WrapperError::InvalidOption { .. } => ErrorKind::Parse,
        }
    }
}
