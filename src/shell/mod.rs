//! The read-eval loop and everything it dispatches to.

pub use self::execute_command::execute;
pub use self::shell::{Dispatch, Shell};

pub mod builtins;
pub mod execute_command;
pub mod job_control;
#[allow(clippy::module_inception)]
mod shell;

const HISTORY_FILE_NAME: &str = ".tsh_history";
const SYNTAX_ERROR_EXIT_STATUS: i32 = 2;
const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 127;

/// How a `Shell` behaves. Interactive sessions keep numbered history and
/// ignore the terminal's job-control signals; scripts and `-c` commands do
/// neither.
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Record lines and expand `!` events. The `history` builtin works either
    /// way.
    enable_command_history: bool,
    command_history_capacity: usize,
    /// Ignore SIGINT, SIGQUIT, SIGTSTP, SIGTTIN and SIGTTOU in the shell
    /// itself when stdin is a terminal.
    enable_job_control: bool,
    /// Report every spawned process on stderr.
    debug: bool,
}

impl ShellConfig {
    /// Configuration for a terminal session keeping the last
    /// `command_history_capacity` lines.
    pub fn interactive(command_history_capacity: usize) -> Self {
        Self {
            enable_command_history: true,
            command_history_capacity,
            enable_job_control: true,
            debug: false,
        }
    }

    /// Configuration for running a script or a single `-c` command.
    pub fn noninteractive() -> Self {
        Default::default()
    }

    pub fn with_debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enable_command_history: false,
            command_history_capacity: 0,
            enable_job_control: false,
            debug: false,
        }
    }
}
