//! Wrapper scripts: tiny text files that adjust the environment of a program
//! and then replace the current process with it.
//!
//! A wrapper script is a list of directives, one per line:
//!
//! ```text
//! #! /usr/bin/program-wrapper
//! set-default GREETING hi
//! prefix PATH : /opt/bin
//! add-args --verbose
//! exec /usr/bin/prog
//! ```
//!
//! The crate works in both directions. The [`interpreter`] reads such a
//! script, applies it to the process and `exec`s the target program, and the
//! [`generator`] writes a script from a flat list of command-line options.
//! Fields are space separated and escaped with a backslash, see [`lexer`].

pub mod env;
mod error;
pub mod generator;
pub mod interpreter;
pub mod lexer;
pub mod list;
pub mod parser;

pub use error::{ErrorKind, WrapperError};
pub use generator::make_wrapper;
pub use interpreter::{Interpreter, run_wrapper};
