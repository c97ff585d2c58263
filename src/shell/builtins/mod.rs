//! Tsh builtins
//!
//! This module includes the implementations of the shell's builtin commands:
//! process listing, the job-control signal commands, history, help and quit.

use nix::unistd::Pid;

use self::prelude::*;

use self::exit::Quit;
use self::help::Help;
use self::history::History;
use self::kill::{Alarm, Blast, Sleep};
use self::procs::Procs;

pub mod prelude {
    pub use std::io::Write;
    pub use std::process::ExitStatus;

    pub use failure::ResultExt;

    pub use crate::core::parser::ParsedCommand;
    pub use crate::errors::{Error, ErrorKind, Result};
    pub use crate::shell::Shell;
    pub use crate::util::TshExitStatusExt;
}

mod exit;
mod help;
mod history;
mod kill;
mod procs;

const ALARM_NAME: &str = "alarm";
const BLAST_NAME: &str = "blast";
const HELP_NAME: &str = "help";
const HISTORY_NAME: &str = "history";
const PROCS_NAME: &str = "procs";
const QUIT_NAME: &str = "quit";
const SLEEP_NAME: &str = "sleep";

/// Represents a Tsh builtin command such as procs or quit.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> String {
        Self::HELP.lines().next().unwrap_or(Self::NAME).to_owned()
    }
    /// Runs the command in the `shell` environment. `command` is the full
    /// parsed line; its first argument is the builtin's name.
    fn run(shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()>;
}

type Handler = fn(&mut Shell, &ParsedCommand, &mut dyn Write) -> Result<()>;

struct Builtin {
    name: &'static str,
    help: &'static str,
    run: Handler,
}

/// Every builtin, in the order `help` lists them.
const BUILTINS: &[Builtin] = &[
    Builtin {
        name: Alarm::NAME,
        help: Alarm::HELP,
        run: Alarm::run,
    },
    Builtin {
        name: Blast::NAME,
        help: Blast::HELP,
        run: Blast::run,
    },
    Builtin {
        name: Help::NAME,
        help: Help::HELP,
        run: Help::run,
    },
    Builtin {
        name: History::NAME,
        help: History::HELP,
        run: History::run,
    },
    Builtin {
        name: Procs::NAME,
        help: Procs::HELP,
        run: Procs::run,
    },
    Builtin {
        name: Quit::NAME,
        help: Quit::HELP,
        run: Quit::run,
    },
    Builtin {
        name: Sleep::NAME,
        help: Sleep::HELP,
        run: Sleep::run,
    },
];

fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    lookup(program.as_ref()).is_some()
}

/// Runs the builtin named by the command's first argument.
/// Returns (`exit_status_code`, `builtin_result`)
pub fn run(
    shell: &mut Shell,
    command: &ParsedCommand,
    stdout: &mut dyn Write,
) -> (ExitStatus, Result<()>) {
    let result = match lookup(command.name()) {
        Some(builtin) => (builtin.run)(shell, command, stdout),
        None => Err(Error::builtin_command(
            format!("{}: not a shell builtin", command.name()),
            1,
        )),
    };

    let exit_status = get_builtin_exit_status(&result);
    (exit_status, result)
}

fn get_builtin_exit_status(result: &Result<()>) -> ExitStatus {
    let status = if let Err(ref e) = *result {
        match *e.kind() {
            ErrorKind::BuiltinCommand { code, .. } => code,
            _ => 1,
        }
    } else {
        0
    };

    ExitStatus::from_status(status)
}

/// Arguments following the builtin's name.
fn args(command: &ParsedCommand) -> &[String] {
    command.arguments.get(1..).unwrap_or(&[])
}

/// Parses the single `<pid>` argument of the job-control builtins. A missing
/// or malformed pid is a usage error.
fn parse_pid<B: BuiltinCommand>(command: &ParsedCommand) -> Result<Pid> {
    let usage_error = || Error::builtin_command(format!("{}: usage: {}", B::NAME, B::usage()), 2);

    let arg = args(command).first().ok_or_else(usage_error)?;
    match arg.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(Pid::from_raw(pid)),
        _ => {
            eprintln!("tsh: {}: {}: invalid pid", B::NAME, arg);
            Err(usage_error())
        }
    }
}
