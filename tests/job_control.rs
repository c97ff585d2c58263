//! Drives the job-control builtins through the shell's dispatcher.

use std::fs;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use tsh::{Dispatch, ProcessState, Shell, ShellConfig};

fn dispatch(shell: &mut Shell, input: &str) -> (Dispatch, String) {
    let mut out = Vec::new();
    let dispatch = shell.dispatch_to(input, &mut out);
    (dispatch, String::from_utf8(out).unwrap())
}

fn only_pid(shell: &Shell) -> Pid {
    let entries = shell.process_table().entries();
    assert_eq!(entries.len(), 1);
    entries[0].pid()
}

fn state(shell: &Shell, pid: Pid) -> Option<ProcessState> {
    shell.process_table().get(pid).map(|e| e.state())
}

/// The state letter the kernel reports for `pid` in `/proc/<pid>/stat`.
fn kernel_state(pid: Pid) -> Option<char> {
    let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    let after_name = &stat[stat.rfind(')')? + 1..];
    after_name.trim_start().chars().next()
}

/// Polls until the kernel reports `pid` in a state accepted by `wanted`.
fn wait_for_kernel_state<F: Fn(char) -> bool>(pid: Pid, wanted: F) -> Option<char> {
    let mut last = None;
    for _ in 0..100 {
        last = kernel_state(pid);
        if last.map_or(false, &wanted) {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    last
}

#[test]
fn test_suspend_resume_terminate_cycle() {
    let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();

    assert_eq!(
        dispatch(&mut shell, "tail -f /dev/null &").0,
        Dispatch::Executed
    );
    let pid = only_pid(&shell);

    let (_, out) = dispatch(&mut shell, "procs");
    assert_eq!(
        out,
        format!("PID\t\tCommand\t\tSTATUS\n{}\t\ttail\tRunning\n", pid)
    );

    let (d, out) = dispatch(&mut shell, &format!("sleep {}", pid));
    assert_eq!(d, Dispatch::Builtin);
    assert_eq!(
        out,
        format!("Process with PID {} suspended successfully.\n", pid)
    );
    assert_eq!(state(&shell, pid), Some(ProcessState::Suspended));
    assert_eq!(wait_for_kernel_state(pid, |s| s == 'T'), Some('T'));
    let (_, out) = dispatch(&mut shell, "procs");
    assert!(out.contains(&format!("{}\t\ttail\tSuspended\n", pid)), "{}", out);

    let (_, out) = dispatch(&mut shell, &format!("alarm {}", pid));
    assert_eq!(
        out,
        format!("Process with PID {} resumed successfully.\n", pid)
    );
    let resumed = wait_for_kernel_state(pid, |s| s != 'T');
    assert!(resumed.map_or(false, |s| s != 'T'), "{:?}", resumed);
    let (_, out) = dispatch(&mut shell, "procs");
    assert!(out.contains(&format!("{}\t\ttail\tRunning\n", pid)), "{}", out);

    let (_, out) = dispatch(&mut shell, &format!("blast {}", pid));
    assert_eq!(
        out,
        format!("Process with PID {} terminated successfully.\n", pid)
    );
    assert_eq!(state(&shell, pid), Some(ProcessState::Terminated));

    // listed once as Terminated, then gone
    let (_, out) = dispatch(&mut shell, "procs");
    assert!(out.contains(&format!("{}\t\ttail\tTerminated\n", pid)), "{}", out);
    let (_, out) = dispatch(&mut shell, "procs");
    assert_eq!(out, "PID\t\tCommand\t\tSTATUS\n");
    assert!(shell.process_table().is_empty());
}

#[test]
fn test_resume_running_process_is_harmless() {
    let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
    dispatch(&mut shell, "tail -f /dev/null &");
    let pid = only_pid(&shell);

    let (d, out) = dispatch(&mut shell, &format!("alarm {}", pid));
    assert_eq!(d, Dispatch::Builtin);
    assert_eq!(
        out,
        format!("Process with PID {} resumed successfully.\n", pid)
    );
    assert_eq!(shell.last_exit_status().code(), Some(0));

    let (_, out) = dispatch(&mut shell, "procs");
    assert_eq!(
        out,
        format!("PID\t\tCommand\t\tSTATUS\n{}\t\ttail\tRunning\n", pid)
    );

    signal::kill(pid, Signal::SIGKILL).unwrap();
}

#[test]
fn test_externally_killed_process_is_reported_terminated() {
    let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
    dispatch(&mut shell, "tail -f /dev/null &");
    let pid = only_pid(&shell);

    signal::kill(pid, Signal::SIGKILL).unwrap();
    let mut listed = String::new();
    for _ in 0..100 {
        thread::sleep(Duration::from_millis(20));
        let (_, out) = dispatch(&mut shell, "procs");
        if out.contains("Terminated") {
            listed = out;
            break;
        }
    }
    assert_eq!(
        listed,
        format!("PID\t\tCommand\t\tSTATUS\n{}\t\ttail\tTerminated\n", pid)
    );
    assert!(shell.process_table().is_empty());
}

#[test]
fn test_failed_delivery_keeps_state() {
    let mut shell = Shell::new(ShellConfig::noninteractive()).unwrap();
    dispatch(&mut shell, "tail -f /dev/null &");
    let pid = only_pid(&shell);

    signal::kill(pid, Signal::SIGKILL).unwrap();
    for _ in 0..100 {
        thread::sleep(Duration::from_millis(20));
        shell.process_table_mut().reconcile().unwrap();
        if state(&shell, pid) == Some(ProcessState::Terminated) {
            break;
        }
    }

    // reaped and pruned: the pid no longer exists
    dispatch(&mut shell, "procs");
    let (_, out) = dispatch(&mut shell, &format!("alarm {}", pid));
    assert!(out.is_empty());
    assert_eq!(shell.last_exit_status().code(), Some(1));
    assert!(shell.process_table().is_empty());
}
