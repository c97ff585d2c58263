//! Launches a parsed command as one process, or two processes connected by a
//! pipe, and registers background commands with the process table.

use std::ffi::{CStr, CString, OsStr};
use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus};

use failure::{Fail, ResultExt};
use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::libc;
use nix::sys::stat::Mode;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};

use crate::core::{
    parser::ParsedCommand,
    process_table::{ProcessListing, ProcessState, ProcessTable},
};
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::job_control;
use crate::util::{self, TshExitStatusExt};

/// Descriptor plumbing for one stage, performed in the forked child.
#[derive(Debug, Default)]
struct StageIo {
    /// Pipe end to duplicate onto stdin.
    pipe_stdin: Option<RawFd>,
    /// Pipe end to duplicate onto stdout.
    pipe_stdout: Option<RawFd>,
    /// Both ends of the pipe (read, write); closed after duplication.
    pipe: Option<(RawFd, RawFd)>,
    input_redirect: Option<CString>,
    output_redirect: Option<CString>,
}

impl StageIo {
    /// Runs in the child between fork and exec. Must not allocate.
    fn apply(&self) -> io::Result<()> {
        job_control::restore_default_dispositions()?;

        if let Some(fd) = self.pipe_stdin {
            unistd::dup2(fd, libc::STDIN_FILENO)?;
        }
        if let Some(fd) = self.pipe_stdout {
            unistd::dup2(fd, libc::STDOUT_FILENO)?;
        }
        if let Some((read_end, write_end)) = self.pipe {
            unistd::close(read_end)?;
            unistd::close(write_end)?;
        }

        if let Some(ref path) = self.input_redirect {
            redirect(path, OFlag::O_RDONLY, libc::STDIN_FILENO)?;
        }
        if let Some(ref path) = self.output_redirect {
            redirect(
                path,
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                libc::STDOUT_FILENO,
            )?;
        }

        Ok(())
    }
}

/// Runs `command`, blocking until its last stage terminates unless it runs
/// in the background, in which case the last stage is registered with
/// `process_table`.
///
/// Returns the exit status of the awaited process, or success for background
/// commands.
pub fn execute(
    mut command: ParsedCommand,
    process_table: &mut ProcessTable,
    debug_mode: bool,
) -> Result<ExitStatus> {
    match command.next.take() {
        None => execute_simple(command, process_table, debug_mode),
        Some(second) => execute_pipeline(command, *second, process_table, debug_mode),
    }
}

fn execute_simple(
    command: ParsedCommand,
    process_table: &mut ProcessTable,
    debug_mode: bool,
) -> Result<ExitStatus> {
    let stage_io = StageIo {
        input_redirect: redirect_path(&command, command.input_redirect.as_ref())?,
        output_redirect: redirect_path(&command, command.output_redirect.as_ref())?,
        ..Default::default()
    };
    let pid = spawn_stage(&command, stage_io, debug_mode)?;

    if command.foreground {
        wait_for_foreground(pid, command, process_table)
    } else {
        register_background(pid, command, process_table, debug_mode);
        Ok(ExitStatus::from_success())
    }
}

fn execute_pipeline(
    mut first: ParsedCommand,
    second: ParsedCommand,
    process_table: &mut ProcessTable,
    debug_mode: bool,
) -> Result<ExitStatus> {
    let first_io = StageIo {
        input_redirect: redirect_path(&first, first.input_redirect.as_ref())?,
        ..Default::default()
    };
    let second_io = StageIo {
        output_redirect: redirect_path(&second, second.output_redirect.as_ref())?,
        ..Default::default()
    };

    let (read_end_pipe, write_end_pipe) = create_pipe()?;
    let ends = (read_end_pipe.as_raw_fd(), write_end_pipe.as_raw_fd());

    let first_pid = spawn_stage(
        &first,
        StageIo {
            pipe_stdout: Some(ends.1),
            pipe: Some(ends),
            ..first_io
        },
        debug_mode,
    )?;
    let second_pid = match spawn_stage(
        &second,
        StageIo {
            pipe_stdin: Some(ends.0),
            pipe: Some(ends),
            ..second_io
        },
        debug_mode,
    ) {
        Ok(pid) => pid,
        Err(e) => {
            process_table.adopt_unlisted(first_pid);
            return Err(e);
        }
    };

    // The shell must not hold the write end, or the second stage never sees
    // end of input.
    drop(read_end_pipe);
    drop(write_end_pipe);

    let foreground = first.foreground;
    first.next = Some(Box::new(second));
    if foreground {
        let status = wait_for_foreground(second_pid, first, process_table)?;
        reap_or_adopt(first_pid, process_table);
        Ok(status)
    } else {
        // only the last stage is listed; the first is reaped quietly
        process_table.adopt_unlisted(first_pid);
        register_background(second_pid, first, process_table, debug_mode);
        Ok(ExitStatus::from_success())
    }
}

fn spawn_stage(stage: &ParsedCommand, stage_io: StageIo, debug_mode: bool) -> Result<Pid> {
    let program = stage.name();
    let has_redirect = stage_io.input_redirect.is_some() || stage_io.output_redirect.is_some();

    let mut command = Command::new(OsStr::new(program));
    command.args(stage.arguments.iter().skip(1));
    unsafe {
        command.pre_exec(move || stage_io.apply());
    }

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            // with a redirect, ENOENT may just as well come from the target
            if e.kind() == io::ErrorKind::NotFound && !has_redirect {
                return Err(Error::command_not_found(program));
            }
            return Err(e.context(ErrorKind::Spawn(program.to_string())).into());
        }
    };

    let pid = Pid::from_raw(child.id() as libc::pid_t);
    debug!("spawned {} for '{}'", pid, stage);
    if debug_mode {
        eprintln!("PID: {}", pid);
        eprintln!("Executing command: {}", program);
    }

    Ok(pid)
}

/// Waits for `pid` to terminate or stop. A stopped process is handed to the
/// process table as Suspended so it can be resumed later.
fn wait_for_foreground(
    pid: Pid,
    command: ParsedCommand,
    process_table: &mut ProcessTable,
) -> Result<ExitStatus> {
    loop {
        let wait_status = match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(wait_status) => wait_status,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.context(ErrorKind::Wait(pid)).into()),
        };

        if let Some(exit_status) = util::exit_status_from_wait(&wait_status) {
            debug!("{} finished: {:?}", pid, wait_status);
            return Ok(exit_status);
        }

        if let WaitStatus::Stopped(_, signal) = wait_status {
            debug!("{} was signaled to stop {:?}", pid, signal);
            println!(
                "{}",
                ProcessListing {
                    pid,
                    name: command.name().to_string(),
                    state: ProcessState::Suspended,
                }
            );
            process_table.register(pid, command);
            process_table.update_status(pid, ProcessState::Suspended);
            return Ok(ExitStatus::from_status(128 + signal as i32));
        }
    }
}

fn register_background(
    pid: Pid,
    command: ParsedCommand,
    process_table: &mut ProcessTable,
    debug_mode: bool,
) {
    if debug_mode {
        eprintln!(
            "Background process started: {} (PID: {})",
            command.name(),
            pid
        );
    }
    process_table.register(pid, command);
}

/// Reaps the first stage of a finished foreground pipeline if it is done,
/// otherwise leaves it to the process table.
fn reap_or_adopt(pid: Pid, process_table: &mut ProcessTable) {
    match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => {
            debug!("reaped first pipeline stage {}", pid)
        }
        Ok(_) => process_table.adopt_unlisted(pid),
        Err(e) => warn!("failed to reap first pipeline stage {}: {}", pid, e),
    }
}

/// Opens `path` and duplicates it onto `target`, closing the original
/// descriptor on every path.
fn redirect(path: &CStr, flags: OFlag, target: RawFd) -> nix::Result<()> {
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    let fd = fcntl::open(path, flags, mode)?;
    if fd == target {
        return Ok(());
    }

    let result = unistd::dup2(fd, target);
    unistd::close(fd)?;
    result.map(drop)
}

fn redirect_path(stage: &ParsedCommand, path: Option<&String>) -> Result<Option<CString>> {
    match path {
        Some(path) => {
            let path = CString::new(path.as_str())
                .context(ErrorKind::Spawn(stage.name().to_string()))?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

/// Wraps `unistd::pipe()` to return RAII structs instead of raw, owning file descriptors
/// Returns (`read_end_pipe`, `write_end_pipe`)
///
/// Both ends are close-on-exec so that no unrelated child inherits them; the
/// duplicates made onto stdin/stdout in a stage are not.
fn create_pipe() -> Result<(File, File)> {
    // IMPORTANT: immediately pass the RawFds returned by unistd::pipe()
    // into RAII structs (File). If the function returns before they are moved
    // into RAII structs, the fds could be leaked.
    let (read_end_pipe, write_end_pipe) = unistd::pipe().context(ErrorKind::Pipe)?;
    let pipe = unsafe {
        (
            File::from_raw_fd(read_end_pipe),
            File::from_raw_fd(write_end_pipe),
        )
    };

    for fd in &[read_end_pipe, write_end_pipe] {
        fcntl::fcntl(*fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).context(ErrorKind::Pipe)?;
    }

    Ok(pipe)
}
