use std::fs;
use std::os::unix::fs::PermissionsExt;

use cinder::shell::state::jobs::launch::{self, Command, EXIT_CANNOT_RUN, EXIT_REDIRECT_FAILED};
use cinder::shell::state::jobs::{self, ExitStatus};
use cinder::shell::state::Session;
use cinder::shell::syntax::{lexer, redirect};

fn run(line: &str) -> ExitStatus {
    let tokens = lexer::lex(line.as_bytes()).unwrap();
    let plan = redirect::plan(&tokens).unwrap();
    let command = Command::new(&plan, false).unwrap();
    let session = Session::detached();
    let child = launch::launch(&session, &command).unwrap();
    jobs::run_foreground(&session, child).unwrap()
}

#[test]
fn exit_status_is_collected() {
    assert_eq!(run("/bin/sh -c 'exit 3'"), ExitStatus::Exited(3));
    assert!(run("sh -c true").success());
}

#[test]
fn output_redirection_creates_owner_only_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let status = run(&format!("echo hi > {}", out.display()));

    assert!(status.success());
    assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
    let mode = fs::metadata(&out).unwrap().permissions().mode();
    assert_eq!(mode & 0o700, 0o700);
}

#[test]
fn output_redirection_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    fs::write(&out, "a much longer previous content\n").unwrap();

    assert!(run(&format!("echo new > {}", out.display())).success());
    assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");
}

#[test]
fn input_and_output_together() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, "pear\napple\n").unwrap();

    let line = format!("sort < {} > {}", input.display(), output.display());
    assert!(run(&line).success());
    assert_eq!(fs::read_to_string(&output).unwrap(), "apple\npear\n");
}

#[test]
fn unknown_program_exits_127() {
    let status = run("cinder-test-no-such-program");
    assert_eq!(status, ExitStatus::Exited(EXIT_CANNOT_RUN));
}

#[test]
fn unknown_program_still_gets_its_redirection() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("created.txt");
    let status = run(&format!("cinder-test-no-such-program > {}", out.display()));

    assert_eq!(status.code(), EXIT_CANNOT_RUN);
    assert!(out.exists());
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn missing_input_file_fails_before_exec() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let status = run(&format!("cat < {}", missing.display()));
    assert_eq!(status, ExitStatus::Exited(EXIT_REDIRECT_FAILED));
}
