//! Error module. See the [failure](https://crates.io/crates/failure) crate for details.

use std::fmt;
use std::result;

use failure::{Backtrace, Context, Fail};
use nix::sys::signal::Signal;
use nix::unistd::Pid;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    /// Renders the error followed by each of its causes, e.g.
    /// `failed to send SIGCONT to 42: ESRCH: No such process`.
    pub fn display_chain(&self) -> String {
        let mut out = self.to_string();
        let mut cause = Fail::cause(self);
        while let Some(c) = cause {
            out.push_str(": ");
            out.push_str(&c.to_string());
            cause = c.cause();
        }
        out
    }

    pub(crate) fn syntax<T: AsRef<str>>(line: T) -> Error {
        Error::from(ErrorKind::Syntax(line.as_ref().to_string()))
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        Error::from(ErrorKind::BuiltinCommand {
            message: message.as_ref().to_string(),
            code,
        })
    }

    pub(crate) fn command_not_found<T: AsRef<str>>(command: T) -> Error {
        Error::from(ErrorKind::CommandNotFound(command.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ctx.fmt(f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Syntax(String),
    BuiltinCommand { message: String, code: i32 },
    CommandNotFound(String),
    Spawn(String),
    Pipe,
    Wait(Pid),
    SignalDelivery { signal: Signal, pid: Pid },
    Reconcile(Pid),
    WorkingDirectory,
    HistoryFileNotFound,
    Docopt,
    Io,
    Nix,
    Readline,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::Syntax(ref line) => write!(f, "syntax error near: '{}'", line),
            ErrorKind::BuiltinCommand { ref message, .. } => write!(f, "{}", message),
            ErrorKind::CommandNotFound(ref line) => write!(f, "{}: command not found", line),
            ErrorKind::Spawn(ref program) => write!(f, "{}: failed to launch", program),
            ErrorKind::Pipe => write!(f, "pipe failed"),
            ErrorKind::Wait(pid) => write!(f, "failed to wait for process {}", pid),
            ErrorKind::SignalDelivery { signal, pid } => {
                write!(f, "failed to send {} to {}", signal, pid)
            }
            ErrorKind::Reconcile(pid) => write!(f, "failed to probe status of process {}", pid),
            ErrorKind::WorkingDirectory => write!(f, "unable to read current working directory"),
            ErrorKind::HistoryFileNotFound => write!(f, "history file not found"),
            ErrorKind::Docopt => write!(f, "Docopt error occurred"),
            ErrorKind::Io => write!(f, "I/O error occurred"),
            ErrorKind::Nix => write!(f, "Nix error occurred"),
            ErrorKind::Readline => write!(f, "Readline error occurred"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

#[cfg(test)]
mod tests {
    use failure::ResultExt;
    use nix::errno::Errno;

    use super::*;

    #[test]
    fn display_chain_includes_os_error() {
        let result: result::Result<(), Errno> = Err(Errno::ESRCH);
        let error: Error = result
            .context(ErrorKind::SignalDelivery {
                signal: Signal::SIGCONT,
                pid: Pid::from_raw(42),
            })
            .unwrap_err()
            .into();

        let chain = error.display_chain();
        assert!(chain.starts_with("failed to send SIGCONT to 42: "));
        assert!(chain.contains("No such process"));
    }

    #[test]
    fn display_chain_without_cause() {
        let error = Error::command_not_found("frobnicate");
        assert_eq!(error.display_chain(), "frobnicate: command not found");
        assert_eq!(
            *error.kind(),
            ErrorKind::CommandNotFound("frobnicate".to_string())
        );
    }
}
