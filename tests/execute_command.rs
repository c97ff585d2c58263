//! Executor tests against real child processes.

use std::fs;
use std::process::Command;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use tempdir::TempDir;

use tsh::core::parser::ParsedCommandBuilder;
use tsh::errors::ErrorKind;
use tsh::shell::execute;
use tsh::{ParsedCommand, ProcessState, ProcessTable};

fn path_arg(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

fn run(command: ParsedCommand, table: &mut ProcessTable) -> Option<i32> {
    execute(command, table, false)
        .expect("execute failed")
        .code()
}

#[test]
fn test_output_redirect_creates_and_truncates() {
    let dir = TempDir::new("tsh-exec").unwrap();
    let out = path_arg(&dir, "out.txt");
    let mut table = ProcessTable::new();

    let first = ParsedCommandBuilder::new()
        .args(&["printf", "abcdef"])
        .stdout(out.as_str())
        .build();
    assert_eq!(run(first, &mut table), Some(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "abcdef");

    let second = ParsedCommandBuilder::new()
        .args(&["printf", "xy"])
        .stdout(out.as_str())
        .build();
    assert_eq!(run(second, &mut table), Some(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "xy");
    assert!(table.is_empty());
}

#[test]
fn test_input_redirect() {
    let dir = TempDir::new("tsh-exec").unwrap();
    let input = path_arg(&dir, "in.txt");
    let out = path_arg(&dir, "out.txt");
    fs::write(&input, "one\ntwo\n").unwrap();

    let command = ParsedCommandBuilder::new()
        .args(&["cat"])
        .stdin(input.as_str())
        .stdout(out.as_str())
        .build();
    assert_eq!(run(command, &mut ProcessTable::new()), Some(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\n");
}

#[test]
fn test_pipeline_matches_system_shell() {
    let dir = TempDir::new("tsh-exec").unwrap();
    let out = path_arg(&dir, "out.txt");

    let command = ParsedCommand::parse(&format!("printf 'b\\na\\nc\\n' | sort > {}", out))
        .unwrap()
        .unwrap();
    assert!(command.is_pipeline());
    assert_eq!(run(command, &mut ProcessTable::new()), Some(0));

    let expected = Command::new("sh")
        .arg("-c")
        .arg("printf 'b\\na\\nc\\n' | sort")
        .output()
        .unwrap();
    assert_eq!(
        fs::read_to_string(&out).unwrap().as_bytes(),
        &expected.stdout[..]
    );
}

#[test]
fn test_pipeline_with_both_redirects() {
    let dir = TempDir::new("tsh-exec").unwrap();
    let input = path_arg(&dir, "in.txt");
    let out = path_arg(&dir, "out.txt");
    fs::write(&input, "x\ny\nz\n").unwrap();

    let second = ParsedCommandBuilder::new()
        .args(&["wc", "-l"])
        .stdout(out.as_str())
        .build();
    let command = ParsedCommandBuilder::new()
        .args(&["cat"])
        .stdin(input.as_str())
        .pipe(second)
        .build();
    assert_eq!(run(command, &mut ProcessTable::new()), Some(0));
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
}

#[test]
fn test_pipeline_status_is_last_stage() {
    let mut table = ProcessTable::new();
    let command = ParsedCommand::parse("true | false").unwrap().unwrap();
    assert_eq!(run(command, &mut table), Some(1));

    let command = ParsedCommand::parse("false | true").unwrap().unwrap();
    assert_eq!(run(command, &mut table), Some(0));
    assert!(table.is_empty());
}

#[test]
fn test_foreground_exit_statuses() {
    let mut table = ProcessTable::new();
    assert_eq!(run(ParsedCommand::new(&["false"]), &mut table), Some(1));
    assert_eq!(
        run(ParsedCommand::new(&["sh", "-c", "exit 7"]), &mut table),
        Some(7)
    );
    assert_eq!(
        run(ParsedCommand::new(&["sh", "-c", "kill -TERM $$"]), &mut table),
        Some(128 + 15)
    );
}

#[test]
fn test_command_not_found() {
    let mut table = ProcessTable::new();
    let err = execute(
        ParsedCommand::new(&["tsh-no-such-program"]),
        &mut table,
        false,
    )
    .unwrap_err();
    assert_eq!(
        *err.kind(),
        ErrorKind::CommandNotFound("tsh-no-such-program".to_string())
    );
    assert!(table.is_empty());
}

#[test]
fn test_missing_input_file_fails_the_stage() {
    let dir = TempDir::new("tsh-exec").unwrap();
    let missing = path_arg(&dir, "missing.txt");
    let mut table = ProcessTable::new();

    let command = ParsedCommandBuilder::new()
        .args(&["cat"])
        .stdin(missing.as_str())
        .background()
        .build();
    let err = execute(command, &mut table, false).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::Spawn("cat".to_string()));
    assert!(table.is_empty());
}

#[test]
fn test_background_command_is_registered_running() {
    let mut table = ProcessTable::new();
    let command = ParsedCommand::parse("tail -f /dev/null &").unwrap().unwrap();

    assert_eq!(run(command, &mut table), Some(0));
    assert_eq!(table.len(), 1);
    let (pid, state, name) = {
        let entry = table.entries()[0];
        (entry.pid(), entry.state(), entry.command().name().to_string())
    };
    assert_eq!(state, ProcessState::Running);
    assert_eq!(name, "tail");

    signal::kill(pid, Signal::SIGKILL).unwrap();
    for _ in 0..100 {
        table.reconcile().unwrap();
        if table.get(pid).map(|e| e.state()) == Some(ProcessState::Terminated) {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let listing = table.list_and_prune();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].state, ProcessState::Terminated);
    assert!(table.is_empty());
}

#[test]
fn test_background_pipeline_registers_one_entry() {
    let mut table = ProcessTable::new();
    let command = ParsedCommand::parse("/bin/sleep 1 | cat &").unwrap().unwrap();

    assert_eq!(run(command, &mut table), Some(0));
    assert_eq!(table.len(), 1);
    let entry = table.entries()[0];
    assert_eq!(entry.command().name(), "/bin/sleep");
    assert!(entry.command().is_pipeline());
    assert_eq!(entry.state(), ProcessState::Running);
}
