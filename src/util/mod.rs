use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::libc;
use nix::sys::wait::WaitStatus;
use nix::unistd;

/// Tsh Utility Extensions for `ExitStatus`
pub trait TshExitStatusExt {
    /// Create an ExitStatus to indicate *successful* program execution.
    fn from_success() -> Self;

    /// Create an ExitStatus to indicate *unsuccessful* program execution.
    fn from_failure() -> Self;

    /// Create an ExitStatus from a status code
    fn from_status(code: i32) -> Self;
}

impl TshExitStatusExt for ExitStatus {
    /// # Examples
    /// ```rust
    /// use std::process::ExitStatus;
    /// use tsh::TshExitStatusExt;
    /// assert!(ExitStatus::from_success().success());
    /// ```
    fn from_success() -> Self {
        ExitStatus::from_status(0)
    }

    /// # Examples
    /// ```rust
    /// use std::process::ExitStatus;
    /// use tsh::TshExitStatusExt;
    /// assert!(!ExitStatus::from_failure().success());
    /// ```
    fn from_failure() -> Self {
        ExitStatus::from_status(1)
    }

    /// # Examples
    /// ```rust
    /// use std::process::ExitStatus;
    /// use tsh::TshExitStatusExt;
    /// assert!(ExitStatus::from_status(0).success());
    /// assert_eq!(ExitStatus::from_status(85).code(), Some(85));
    /// ```
    fn from_status(code: i32) -> Self {
        ExitStatus::from_raw(code << 8)
    }
}

/// Converts a terminal wait status into the shell's notion of an exit
/// status. A process killed by a signal reports `128 + signo`, like bash.
pub fn exit_status_from_wait(wait_status: &WaitStatus) -> Option<ExitStatus> {
    match *wait_status {
        WaitStatus::Exited(_, code) => Some(ExitStatus::from_status(code)),
        WaitStatus::Signaled(_, signal, _) => Some(ExitStatus::from_status(128 + signal as i32)),
        _ => None,
    }
}

/// Whether the shell's standard input is a terminal. Job-control signal
/// handling is only armed for terminal sessions.
pub fn stdin_is_terminal() -> bool {
    let result = unistd::isatty(libc::STDIN_FILENO);
    log_if_err!(result, "isatty(stdin)");
    result.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    use super::*;

    #[test]
    fn test_exit_status_from_exited() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 3);
        assert_eq!(
            exit_status_from_wait(&status).and_then(|s| s.code()),
            Some(3)
        );
    }

    #[test]
    fn test_exit_status_from_signaled() {
        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGINT, false);
        assert_eq!(
            exit_status_from_wait(&status).and_then(|s| s.code()),
            Some(130)
        );
    }

    #[test]
    fn test_exit_status_from_stopped() {
        let status = WaitStatus::Stopped(Pid::from_raw(1), Signal::SIGTSTP);
        assert!(exit_status_from_wait(&status).is_none());
    }
}
