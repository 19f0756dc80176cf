use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons an environment variable cannot be set or removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("Invalid argument")]
    InvalidName,
    #[error("value contains a NUL byte")]
    InvalidValue,
}

/// The part of the process state a wrapper script is allowed to change.
///
/// Directives go through this trait so that they can run either against the
/// real process ([`ProcessEnvironment`]) or against an in-memory copy
/// ([`MemEnvironment`]). Names and values are raw bytes, no encoding is
/// assumed.
pub trait Environment {
    /// Get the value of a variable, `None` when unset.
    fn get_var(&self, key: &OsStr) -> Option<OsString>;

    /// Set a variable. When `overwrite` is false an existing value is kept.
    fn set_var(&mut self, key: &OsStr, val: &OsStr, overwrite: bool) -> Result<(), EnvError>;

    /// Remove a variable. Removing an unset variable is not an error.
    fn unset_var(&mut self, key: &OsStr) -> Result<(), EnvError>;

    /// Change the working directory.
    fn set_current_dir(&mut self, path: &Path) -> io::Result<()>;
}

/// Same rules as `setenv(3)`: a name must be non-empty and contain neither
/// `=` nor NUL.
fn check_name(key: &OsStr) -> Result<(), EnvError> {
    let key = key.as_bytes();
    if key.is_empty() || key.contains(&b'=') || key.contains(&0) {
        Err(EnvError::InvalidName)
    } else {
        Ok(())
    }
}

fn check_value(val: &OsStr) -> Result<(), EnvError> {
    if val.as_bytes().contains(&0) {
        Err(EnvError::InvalidValue)
    } else {
        Ok(())
    }
}

/// The environment and working directory of the running process.
///
/// Changes made here are inherited by the program the wrapper finally
/// executes.
#[derive(Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn get_var(&self, key: &OsStr) -> Option<OsString> {
        check_name(key).ok()?;
        stdenv::var_os(key)
    }

    fn set_var(&mut self, key: &OsStr, val: &OsStr, overwrite: bool) -> Result<(), EnvError> {
        check_name(key)?;
        check_value(val)?;
        if !overwrite && stdenv::var_os(key).is_some() {
            return Ok(());
        }
        // SAFETY: the wrapper is single-threaded, nothing reads the
        // environment concurrently.
        unsafe { stdenv::set_var(key, val) };
        Ok(())
    }

    fn unset_var(&mut self, key: &OsStr) -> Result<(), EnvError> {
        check_name(key)?;
        // SAFETY: see `set_var`.
        unsafe { stdenv::remove_var(key) };
        Ok(())
    }

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
        stdenv::set_current_dir(path)
    }
}

/// In-memory environment, seeded from the process or built by hand.
///
/// Fields are public so tests can inspect what a script did.
#[derive(Debug, Clone, Default)]
pub struct MemEnvironment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<OsString, OsString>,
    /// The working directory the script ended up in.
    pub current_dir: PathBuf,
}

impl MemEnvironment {
    /// Capture the current process state into a new `MemEnvironment`.
    pub fn from_process() -> Self {
        let vars = stdenv::vars_os().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }
}

impl Environment for MemEnvironment {
    fn get_var(&self, key: &OsStr) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &OsStr, val: &OsStr, overwrite: bool) -> Result<(), EnvError> {
        check_name(key)?;
        check_value(val)?;
        if overwrite || !self.vars.contains_key(key) {
            self.vars.insert(key.to_owned(), val.to_owned());
        }
        Ok(())
    }

    fn unset_var(&mut self, key: &OsStr) -> Result<(), EnvError> {
        check_name(key)?;
        self.vars.remove(key);
        Ok(())
    }

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
        let new_dir = self.current_dir.join(path);
        if !new_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            ));
        }
        self.current_dir = new_dir;
        Ok(())
    }
}

/// Serializes tests that touch the real process environment or working
/// directory.
#[cfg(test)]
pub(crate) fn lock_process_state() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
