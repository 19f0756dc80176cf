use crate::env::{Environment, ProcessEnvironment};
use crate::error::WrapperError;
use crate::list;
use crate::parser::{self, Directive, LineError};
use log::{debug, warn};
use std::convert::Infallible;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where argv[0] of the executed program comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Argv0Mode {
    /// The path of the wrapper script.
    Wrapper,
    /// The path given to `exec`.
    #[default]
    Wrapped,
    /// A value given by the `argv0` directive.
    Custom(OsString),
}

/// What a script has requested so far, apart from environment changes.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub argv0_mode: Argv0Mode,
    /// Set by `exec`; the last one wins.
    pub exec_path: Option<OsString>,
    /// Accumulated from every `add-args`, in order.
    pub args_before: Vec<OsString>,
}

/// A fully resolved process replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecPlan {
    /// Path of the executable, used as given.
    pub program: OsString,
    /// Complete argument vector, starting with argv[0].
    pub argv: Vec<OsString>,
}

impl ExecPlan {
    /// Replace the current process image.
    ///
    /// Only returns if the replacement failed.
    pub fn exec(self) -> WrapperError {
        let mut argv = self.argv.into_iter();
        let argv0 = argv.next().unwrap_or_default();
        let source = Command::new(program_path(&self.program))
            .arg0(argv0)
            .args(argv)
            .exec();
        WrapperError::Exec {
            path: PathBuf::from(self.program),
            source,
        }
    }
}

/// `exec` never searches `PATH`: a bare name refers to the working directory.
fn program_path(program: &OsStr) -> PathBuf {
    if program.as_bytes().contains(&b'/') {
        PathBuf::from(program)
    } else {
        Path::new(".").join(program)
    }
}

/// Executes wrapper scripts against an [`Environment`].
///
/// The interpreter applies directives one at a time. Environment and
/// directory changes go straight to the environment, everything else is
/// collected in an [`ExecutionState`] that [`Interpreter::into_plan`] turns
/// into the final command line.
///
/// ```
/// use program_wrapper::env::MemEnvironment;
/// use program_wrapper::interpreter::Interpreter;
/// use program_wrapper::parser::parse_line;
/// use std::ffi::{OsStr, OsString};
///
/// let mut interp = Interpreter::new(MemEnvironment::default());
/// for line in ["prefix PATH : /opt/bin", "add-args -v", "exec /bin/prog"] {
///     interp.apply(parse_line(line.as_bytes()).unwrap().unwrap()).unwrap();
/// }
/// assert_eq!(interp.env().vars[OsStr::new("PATH")], "/opt/bin");
/// let plan = interp
///     .into_plan(OsStr::new("/wrapper"), [OsString::from("x")])
///     .unwrap();
/// assert_eq!(plan.argv, ["/bin/prog", "-v", "x"]);
/// ```
pub struct Interpreter<E: Environment> {
    env: E,
    state: ExecutionState,
}

impl<E: Environment> Interpreter<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            state: ExecutionState::default(),
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Execute one directive.
    pub fn apply(&mut self, directive: Directive) -> Result<(), LineError> {
        match directive {
            Directive::Set { name, value } => self.set_var(&name, &value, true),
            Directive::SetDefault { name, value } => self.set_var(&name, &value, false),
            Directive::Unset { name } => {
                self.env
                    .unset_var(&name)
                    .map_err(|source| LineError::UnsetVar {
                        name: name.to_string_lossy().into_owned(),
                        source,
                    })
            }
            Directive::Prefix {
                name,
                separator,
                value,
            } => self.update_list_var(&name, separator, &value, true),
            Directive::Suffix {
                name,
                separator,
                value,
            } => self.update_list_var(&name, separator, &value, false),
            Directive::Cd { path } => self
                .env
                .set_current_dir(&path)
                .map_err(|source| LineError::ChangeDir { path, source }),
            Directive::Argv0 { value } => {
                self.state.argv0_mode = Argv0Mode::Custom(value);
                Ok(())
            }
            Directive::Argv0Wrapper => {
                self.state.argv0_mode = Argv0Mode::Wrapper;
                Ok(())
            }
            Directive::Argv0Wrapped => {
                self.state.argv0_mode = Argv0Mode::Wrapped;
                Ok(())
            }
            Directive::Exec { path } => {
                if let Some(previous) = self.state.exec_path.replace(path) {
                    warn!("exec {previous:?} is overridden by a later exec directive");
                }
                Ok(())
            }
            Directive::AddArgs(args) => {
                self.state.args_before.extend(args);
                Ok(())
            }
        }
    }

    fn set_var(&mut self, name: &OsStr, value: &OsStr, overwrite: bool) -> Result<(), LineError> {
        self.env
            .set_var(name, value, overwrite)
            .map_err(|source| LineError::SetVar {
                name: name.to_string_lossy().into_owned(),
                source,
            })
    }

    fn update_list_var(
        &mut self,
        name: &OsStr,
        separator: u8,
        extra: &OsStr,
        prepend: bool,
    ) -> Result<(), LineError> {
        let current = self.env.get_var(name).unwrap_or_default();
        let merged = list::merge(current.as_bytes(), extra.as_bytes(), separator, prepend);
        self.set_var(name, &OsString::from_vec(merged), true)
    }

    /// Open a script and execute all of its directives.
    pub fn load_script(&mut self, path: &Path) -> Result<(), WrapperError> {
        let file = File::open(path).map_err(|source| WrapperError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_from(path, BufReader::new(file))
    }

    /// Execute all directives read from `reader`; `path` is used in errors.
    ///
    /// Every line is parsed on its own, and the first failing line stops
    /// the script.
    pub fn load_from<R: BufRead>(&mut self, path: &Path, reader: R) -> Result<(), WrapperError> {
        let line_error = |line: usize, error: LineError| WrapperError::Line {
            path: path.to_path_buf(),
            line,
            error,
        };

        for (index, line) in reader.split(b'\n').enumerate() {
            let line_num = index + 1;
            let line = line.map_err(|source: io::Error| WrapperError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let directive = parser::parse_line(&line)
                .map_err(|error| line_error(line_num, error))?;
            if let Some(directive) = directive {
                debug!("{}: line {}: {:?}", path.display(), line_num, directive);
                self.apply(directive)
                    .map_err(|error| line_error(line_num, error))?;
            }
        }
        Ok(())
    }

    /// Build the final command line from the collected state.
    ///
    /// argv is argv[0] (chosen by the argv0 mode), then the `add-args`
    /// arguments, then `extra_args`.
    pub fn into_plan(
        self,
        script_path: &OsStr,
        extra_args: impl IntoIterator<Item = OsString>,
    ) -> Result<ExecPlan, WrapperError> {
        let ExecutionState {
            argv0_mode,
            exec_path,
            args_before,
        } = self.state;
        let Some(program) = exec_path else {
            return Err(WrapperError::NoExec {
                path: PathBuf::from(script_path),
            });
        };

        let argv0 = match argv0_mode {
            Argv0Mode::Wrapper => script_path.to_os_string(),
            Argv0Mode::Wrapped => program.clone(),
            Argv0Mode::Custom(value) => value,
        };
        let argv = std::iter::once(argv0)
            .chain(args_before)
            .chain(extra_args)
            .collect();
        Ok(ExecPlan { program, argv })
    }
}

/// Run the wrapper script at `script_path` in this process.
///
/// Applies the script to the process environment and replaces the process
/// image. Returns only on failure.
pub fn run_wrapper(
    script_path: &OsStr,
    extra_args: Vec<OsString>,
) -> Result<Infallible, WrapperError> {
    let mut interpreter = Interpreter::new(ProcessEnvironment);
    interpreter.load_script(Path::new(script_path))?;
    let plan = interpreter.into_plan(script_path, extra_args)?;
    debug!("executing {:?} with argv {:?}", plan.program, plan.argv);
    Err(plan.exec())
}
