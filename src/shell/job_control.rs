//! Job control: forwarding resume, terminate and suspend requests to tracked
//! processes, and the shell's own disposition of terminal signals.

use std::fmt;

use failure::{Fail, ResultExt};
use log::{debug, info};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::Pid;

use crate::core::{
    parser::ParsedCommand,
    process_table::{ProcessState, ProcessTable},
};
use crate::errors::{ErrorKind, Result};

/// Interactive and job-control signals. The shell ignores them while it
/// owns the terminal; every child gets the default dispositions back.
const JOB_CONTROL_SIGNALS: &[Signal] = &[
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// A request the user can make about a tracked process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobSignal {
    Resume,
    Terminate,
    Suspend,
}

impl JobSignal {
    /// The signal delivered for this request.
    pub fn signal(self) -> Signal {
        match self {
            JobSignal::Resume => Signal::SIGCONT,
            JobSignal::Terminate => Signal::SIGINT,
            JobSignal::Suspend => Signal::SIGTSTP,
        }
    }

    /// The state recorded once the signal was delivered, before the OS
    /// confirms it.
    pub fn projected_state(self) -> ProcessState {
        match self {
            JobSignal::Resume => ProcessState::Running,
            JobSignal::Terminate => ProcessState::Terminated,
            JobSignal::Suspend => ProcessState::Suspended,
        }
    }
}

impl fmt::Display for JobSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match *self {
            JobSignal::Resume => "resumed",
            JobSignal::Terminate => "terminated",
            JobSignal::Suspend => "suspended",
        };
        write!(f, "{}", verb)
    }
}

/// Continues a stopped process.
pub fn resume(process_table: &mut ProcessTable, pid: Pid, command: &ParsedCommand) -> Result<()> {
    send(process_table, pid, command, JobSignal::Resume)
}

/// Asks a process to terminate by interrupting it.
pub fn terminate(
    process_table: &mut ProcessTable,
    pid: Pid,
    command: &ParsedCommand,
) -> Result<()> {
    send(process_table, pid, command, JobSignal::Terminate)
}

/// Stops a process the way the terminal's suspend key does.
pub fn suspend(process_table: &mut ProcessTable, pid: Pid, command: &ParsedCommand) -> Result<()> {
    send(process_table, pid, command, JobSignal::Suspend)
}

/// Delivers `job_signal` to exactly `pid`, then records the projected state.
///
/// Processes the shell does not track may be signaled too; their state is
/// simply not recorded. On failure the table is left untouched.
pub fn send(
    process_table: &mut ProcessTable,
    pid: Pid,
    command: &ParsedCommand,
    job_signal: JobSignal,
) -> Result<()> {
    let signal = job_signal.signal();
    debug!("{}: sending {:?} to {}", command, signal, pid);

    // zero and negative pids address process groups
    if pid.as_raw() <= 0 {
        return Err(Errno::ESRCH
            .context(ErrorKind::SignalDelivery { signal, pid })
            .into());
    }
    signal::kill(pid, signal).context(ErrorKind::SignalDelivery { signal, pid })?;

    process_table.update_status(pid, job_signal.projected_state());
    Ok(())
}

/// Whether the shell currently ignores the job-control signals itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalDisposition {
    Default,
    ShellIgnoring,
}

impl SignalDisposition {
    /// Ignores the job-control signals in the shell process.
    pub fn arm(self) -> Result<SignalDisposition> {
        if self == SignalDisposition::ShellIgnoring {
            return Ok(self);
        }

        set_dispositions(SigHandler::SigIgn).context(ErrorKind::Nix)?;
        info!("shell now ignores job-control signals");
        Ok(SignalDisposition::ShellIgnoring)
    }

    /// Restores the default dispositions in the shell process.
    pub fn disarm(self) -> Result<SignalDisposition> {
        if self == SignalDisposition::Default {
            return Ok(self);
        }

        set_dispositions(SigHandler::SigDfl).context(ErrorKind::Nix)?;
        info!("shell restored default job-control signal dispositions");
        Ok(SignalDisposition::Default)
    }
}

impl Default for SignalDisposition {
    fn default() -> Self {
        SignalDisposition::Default
    }
}

/// Called in a forked child before exec. Must not allocate.
pub(crate) fn restore_default_dispositions() -> nix::Result<()> {
    set_dispositions(SigHandler::SigDfl)
}

fn set_dispositions(handler: SigHandler) -> nix::Result<()> {
    for &signal in JOB_CONTROL_SIGNALS {
        // SigIgn and SigDfl install no handler code
        unsafe {
            signal::signal(signal, handler)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_signal_mapping() {
        assert_eq!(JobSignal::Resume.signal(), Signal::SIGCONT);
        assert_eq!(JobSignal::Terminate.signal(), Signal::SIGINT);
        assert_eq!(JobSignal::Suspend.signal(), Signal::SIGTSTP);

        assert_eq!(JobSignal::Resume.projected_state(), ProcessState::Running);
        assert_eq!(
            JobSignal::Terminate.projected_state(),
            ProcessState::Terminated
        );
        assert_eq!(
            JobSignal::Suspend.projected_state(),
            ProcessState::Suspended
        );

        assert_eq!(JobSignal::Resume.to_string(), "resumed");
        assert_eq!(JobSignal::Terminate.to_string(), "terminated");
        assert_eq!(JobSignal::Suspend.to_string(), "suspended");
    }

    #[test]
    fn test_nonexistent_pid_leaves_table_unchanged() {
        let mut table = ProcessTable::new();
        let pid = Pid::from_raw(i32::MAX);
        let command = ParsedCommand::new(&["tail", "-f", "/dev/null"]);
        table.register(pid, command.clone());

        let err = terminate(&mut table, pid, &command).unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::SignalDelivery {
                signal: Signal::SIGINT,
                pid,
            }
        );
        assert_eq!(table.get(pid).unwrap().state(), ProcessState::Running);
    }

    #[test]
    fn test_group_pids_are_rejected() {
        let mut table = ProcessTable::new();
        let command = ParsedCommand::new(&["alarm", "0"]);
        for &raw in &[0, -1] {
            assert!(resume(&mut table, Pid::from_raw(raw), &command).is_err());
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_disarm_without_arm_is_noop() {
        let disposition = SignalDisposition::default();
        assert_eq!(disposition.disarm().unwrap(), SignalDisposition::Default);
    }
}
