#![cfg(unix)]

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_program-wrapper");

fn make_wrapper(output: &Path, exec: &str, options: &[&str]) -> Output {
    Command::new(BIN)
        .arg("--make-wrapper")
        .arg(output)
        .arg(BIN)
        .arg(exec)
        .args(options)
        .output()
        .expect("run --make-wrapper")
}

fn run_script(script: &Path, args: &[&str], envs: &[(&str, &str)], stdin: &str) -> Output {
    let mut child = Command::new(BIN)
        .arg(script)
        .args(args)
        .env_clear()
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn wrapper");
    // The wrapper may exit before reading anything.
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().expect("wait for wrapper")
}

fn write_script(dir: &Path, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join("wrapper");
    fs::write(&path, contents).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const REPORT: &str = r#"printf '%s|%s|%s\n' "$GREETING" "$PATH" "$*""#;

#[test]
fn generated_wrapper_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let wrapper = dir.path().join("wrapper");
    #[rustfmt::skip]
    let options = [
        "--set-default", "GREETING", "hi",
        "--prefix", "PATH", ":", "/opt/bin",
        "--arg", "-c",
        "--args", "2", REPORT, "sh",
    ];
    let made = make_wrapper(&wrapper, "/bin/sh", &options);
    assert!(made.status.success(), "{}", stderr(&made));

    let contents = fs::read_to_string(&wrapper).unwrap();
    assert!(contents.starts_with(&format!("#! {BIN}\n")));
    assert!(contents.ends_with("exec /bin/sh\n"));

    let path = [("PATH", "/usr/bin:/opt/bin:/bin")];
    let out = run_script(&wrapper, &["foo"], &path, "");
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "hi|/opt/bin:/usr/bin:/bin|foo\n");

    let out = run_script(
        &wrapper,
        &["a b", "c"],
        &[("PATH", "/bin"), ("GREETING", "hello")],
        "",
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "hello|/opt/bin:/bin|a b c\n");
}

#[test]
fn generated_wrapper_runs_through_shebang() {
    // Kernels truncate long #! lines.
    if BIN.len() > 120 {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let wrapper = dir.path().join("wrapper");
    #[rustfmt::skip]
    let options = [
        "--set", "GREETING", "from shebang",
        "--args", "2", "-c", REPORT,
        "--arg", "sh",
    ];
    let made = make_wrapper(&wrapper, "/bin/sh", &options);
    assert!(made.status.success(), "{}", stderr(&made));
    fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();

    let out = Command::new(&wrapper)
        .arg("x")
        .env("PATH", "/bin")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(stdout(&out), "from shebang|/bin|x\n");
}

#[test]
fn argv0_modes_reach_the_program() {
    let dir = tempfile::tempdir().unwrap();
    // A shell reading commands from stdin reports its own argv[0] as $0.
    let print_argv0 = "echo \"$0\"\n";

    let script = write_script(
        dir.path(),
        "argv0 custom\\ name\nadd-args -s\nexec /bin/sh\n",
    );
    let out = run_script(&script, &[], &[], print_argv0);
    assert_eq!(stdout(&out), "custom name\n", "{}", stderr(&out));

    let script = write_script(dir.path(), "argv0-wrapper\nadd-args -s\nexec /bin/sh\n");
    let out = run_script(&script, &[], &[], print_argv0);
    assert_eq!(stdout(&out), format!("{}\n", script.display()));

    let script = write_script(dir.path(), "add-args -s\nexec /bin/sh\n");
    let out = run_script(&script, &[], &[], print_argv0);
    assert_eq!(stdout(&out), "/bin/sh\n");
}

#[test]
fn cd_and_unset_are_inherited() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("work dir");
    fs::create_dir(&target).unwrap();
    let mut contents = OsString::from("cd ");
    contents.push(program_wrapper::lexer::escape_field(&target));
    contents.push("\nunset SECRET\n");
    contents.push("add-args -c pwd;\\ echo\\ \"${SECRET-unset}\"\n");
    contents.push("exec /bin/sh\n");
    let script = write_script(dir.path(), contents.as_bytes());

    let out = run_script(&script, &[], &[("SECRET", "x")], "");
    assert!(out.status.success(), "{}", stderr(&out));
    let expected = fs::canonicalize(&target).unwrap();
    assert_eq!(stdout(&out), format!("{}\nunset\n", expected.display()));
}

#[test]
fn non_utf8_bytes_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        b"set-default LABEL caf\xe9\n\
          prefix DIRS : /x\n\
          add-args -c printf\\ '%s|%s|%s'\\ \"$LABEL\"\\ \"$DIRS\"\\ \"$1\" sh\n\
          exec /bin/sh\n",
    );

    let out = Command::new(BIN)
        .arg(&script)
        .arg(OsStr::from_bytes(b"caf\xe9.txt"))
        .env_clear()
        .env("DIRS", OsStr::from_bytes(b"/caf\xe9"))
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert_eq!(out.stdout, b"caf\xe9|/x:/caf\xe9|caf\xe9.txt");
}

#[test]
fn missing_exec_fails() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "set FOO bar\n");
    let out = run_script(&script, &[], &[], "");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stderr(&out),
        format!("program-wrapper: {}: No exec command in file.\n", script.display())
    );
}

#[test]
fn parse_errors_name_the_line() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "#! /bin/program-wrapper\nset A b\nfrobnicate\nexec /bin/true\n",
    );
    let out = run_script(&script, &[], &[], "");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stderr(&out),
        format!(
            "program-wrapper: {}: line 3: Invalid command: \"frobnicate\"\n",
            script.display()
        )
    );
}

#[test]
fn exec_and_open_failures() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exec /nonexistent/program\n");
    let out = run_script(&script, &[], &[], "");
    assert_eq!(out.status.code(), Some(1));
    let expected = "program-wrapper: Failed to execute \"/nonexistent/program\": ";
    assert!(stderr(&out).starts_with(expected), "{}", stderr(&out));

    let missing = dir.path().join("missing");
    let out = run_script(&missing, &[], &[], "");
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with(&format!(
        "program-wrapper: {}: Failed to open file: ",
        missing.display()
    )));
}

#[test]
fn usage_errors() {
    let out = Command::new(BIN).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stderr(&out), "program-wrapper: Too few arguments passed.\n");

    let out = Command::new(BIN)
        .args(["--make-wrapper", "out"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stderr(&out),
        "program-wrapper --make-wrapper: Too few arguments passed.\n"
    );

    let dir = tempfile::tempdir().unwrap();
    let out = make_wrapper(&dir.path().join("w"), "/bin/prog", &["--bogus"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stderr(&out),
        "program-wrapper --make-wrapper: --bogus: Invalid option.\n"
    );
}
