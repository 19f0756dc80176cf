//! Splitting of wrapper script lines into fields, and the inverse escaping
//! used when a script is written.
//!
//! Lines and fields are byte strings: only space, backslash and newline are
//! special, every other byte is copied through as it is.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use thiserror::Error;

/// Errors that can occur while splitting a line into fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A backslash was the last byte of the line.
    #[error("Truncated \\ escape sequence.")]
    TruncatedEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    ReadingField,
    ReadingEscape,
}

struct LexingFSM<'a> {
    input: std::slice::Iter<'a, u8>,
    state: LexingState,
    fields: Vec<OsString>,
    buffer: Vec<u8>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a [u8]) -> Self {
        LexingFSM {
            input: line.iter(),
            state: LexingState::ReadingField,
            fields: Vec::new(),
            buffer: Vec::new(),
        }
    }

    fn make_fields(mut self) -> Result<Vec<OsString>, LexingError> {
        while let Some(&byte) = self.input.next() {
            match self.state {
                LexingState::ReadingField => self.handle_field(byte),
                LexingState::ReadingEscape => {
                    self.buffer.push(byte);
                    self.state = LexingState::ReadingField;
                }
            }
        }

        if self.state == LexingState::ReadingEscape {
            return Err(LexingError::TruncatedEscape);
        }

        // The last field is emitted even when it is empty.
        self.fields.push(OsString::from_vec(self.buffer));
        Ok(self.fields)
    }

    fn handle_field(&mut self, byte: u8) {
        match byte {
            b' ' => {
                let field = std::mem::take(&mut self.buffer);
                self.fields.push(OsString::from_vec(field));
            }
            b'\\' => self.state = LexingState::ReadingEscape,
            b => self.buffer.push(b),
        }
    }
}

/// Split a script line (without its trailing newline) into fields.
///
/// Fields are separated by single spaces, so two consecutive spaces produce an
/// empty field. A backslash makes the following byte literal. Blank lines
/// and lines starting with `#` produce no fields at all.
///
/// ```
/// use program_wrapper::lexer::split_into_fields;
/// let fields = split_into_fields(br"set GREETING hello\ world").unwrap();
/// assert_eq!(fields, ["set", "GREETING", "hello world"]);
/// ```
pub fn split_into_fields(line: &[u8]) -> Result<Vec<OsString>, LexingError> {
    if line.is_empty() || line.starts_with(b"#") {
        return Ok(Vec::new());
    }
    LexingFSM::new(line).make_fields()
}

/// Escape a raw value so that [`split_into_fields`] reads it back as one field.
pub fn escape_field(value: impl AsRef<OsStr>) -> OsString {
    let value = value.as_ref().as_bytes();
    let mut result = Vec::with_capacity(value.len());
    for &byte in value {
        if matches!(byte, b' ' | b'\n' | b'\\') {
            result.push(b'\\');
        }
        result.push(byte);
    }
    OsString::from_vec(result)
}

/// Render one script line: the command followed by its escaped fields.
pub fn join_fields<S: AsRef<OsStr>>(command: &str, fields: &[S]) -> OsString {
    let mut line = OsString::from(command);
    for field in fields {
        line.push(" ");
        line.push(escape_field(field));
    }
    line
}
