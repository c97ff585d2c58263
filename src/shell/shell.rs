//! Tsh - Shell Module
//!
//! The Shell itself is responsible for dispatching input lines to builtins or
//! the executor, for tracking background processes and for maintaining an
//! editor of previous commands.

use std::env;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{self, ExitStatus};

use failure::ResultExt;
use log::{error, info, warn};

use crate::core::{parser::ParsedCommand, process_table::ProcessTable};
use crate::editor::Editor;
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::{
    builtins,
    execute_command,
    job_control::SignalDisposition,
    ShellConfig,
    COMMAND_NOT_FOUND_EXIT_STATUS,
    HISTORY_FILE_NAME,
    SYNTAX_ERROR_EXIT_STATUS,
};
use crate::util::{self, TshExitStatusExt};

/// What the shell did with one input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank line, syntax error or failed history expansion.
    Ignored,
    Builtin,
    Executed,
    /// `quit` was requested.
    Exit,
}

/// Tsh Shell
pub struct Shell {
    /// Responsible for readline and history.
    editor: Editor,
    history_file: Option<PathBuf>,
    process_table: ProcessTable,
    /// Exit status of last command executed.
    last_exit_status: ExitStatus,
    /// Set by `quit`.
    requested_exit: Option<ExitStatus>,
    config: ShellConfig,
    signal_disposition: SignalDisposition,
}

impl Shell {
    /// Constructs a new Shell to manage background processes and command history.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        let mut shell = Shell {
            editor: Editor::with_capacity(config.command_history_capacity),
            history_file: None,
            process_table: ProcessTable::new(),
            last_exit_status: ExitStatus::from_success(),
            requested_exit: None,
            config,
            signal_disposition: SignalDisposition::Default,
        };

        if config.enable_job_control && util::stdin_is_terminal() {
            match shell.signal_disposition.arm() {
                Ok(disposition) => shell.signal_disposition = disposition,
                Err(e) => error!(
                    "failed to ignore job-control signals despite isatty: {}",
                    e
                ),
            }
        }

        if config.enable_command_history {
            shell.load_history()?
        }

        info!("tsh started up");
        Ok(shell)
    }

    fn load_history(&mut self) -> Result<()> {
        self.history_file = dirs::home_dir().map(|p| p.join(HISTORY_FILE_NAME));
        if let Some(ref history_file) = self.history_file {
            self.editor.load_history(&history_file).or_else(|e| {
                if let ErrorKind::HistoryFileNotFound = *e.kind() {
                    return Ok(());
                }

                Err(e)
            })?;
        } else {
            warn!("unable to get home directory")
        }

        Ok(())
    }

    /// Shows the current working directory as the prompt and reads a line.
    /// Returns `None` when end of file is reached.
    pub fn prompt(&mut self) -> Result<Option<String>> {
        let cwd = env::current_dir().context(ErrorKind::WorkingDirectory)?;
        let prompt = format!("{}$ ", cwd.display());
        self.editor.readline(&prompt)
    }

    /// Handles one input line, writing builtin output to stdout.
    pub fn dispatch(&mut self, input: &str) -> Dispatch {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.dispatch_to(input, &mut handle)
    }

    /// Handles one input line: history expansion, parsing, then either a
    /// builtin (writing to `stdout` unless redirected) or the executor.
    ///
    /// Failures are reported on stderr and reflected in the last exit status.
    pub fn dispatch_to(&mut self, input: &str, stdout: &mut dyn Write) -> Dispatch {
        let input = input.trim();
        if input.is_empty() {
            return Dispatch::Ignored;
        }

        let line = if self.config.enable_command_history {
            match self.editor.history().expand(input) {
                Ok(line) => {
                    self.editor.record(&line);
                    line
                }
                Err(e) => {
                    self.report(&e);
                    self.last_exit_status = ExitStatus::from_failure();
                    return Dispatch::Ignored;
                }
            }
        } else {
            input.to_owned()
        };

        let command = match ParsedCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => return Dispatch::Ignored,
            Err(e) => {
                self.report(&e);
                self.last_exit_status = ExitStatus::from_status(SYNTAX_ERROR_EXIT_STATUS);
                return Dispatch::Ignored;
            }
        };

        if builtins::is_builtin(command.name()) {
            self.run_builtin(&command, stdout);
            if self.requested_exit.is_some() {
                return Dispatch::Exit;
            }
            return Dispatch::Builtin;
        }

        self.execute_command(command);
        Dispatch::Executed
    }

    /// Runs a command string, e.g. from `tsh -c`.
    pub fn execute_command_string(&mut self, input: &str) -> Dispatch {
        self.dispatch(input)
    }

    /// Runs a tsh script from a file, one command per line, stopping at `quit`.
    pub fn execute_commands_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut f = File::open(path).context(ErrorKind::Io)?;
        let mut buffer = String::new();
        f.read_to_string(&mut buffer).context(ErrorKind::Io)?;

        for line in buffer.lines() {
            if self.dispatch(line) == Dispatch::Exit {
                break;
            }
        }

        Ok(())
    }

    /// Runs commands from stdin until EOF is received or `quit` is entered.
    ///
    /// Fails only if the working directory cannot be determined.
    pub fn execute_from_stdin(&mut self) -> Result<()> {
        loop {
            let input = match self.prompt() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    if let ErrorKind::WorkingDirectory = *e.kind() {
                        return Err(e);
                    }
                    self.report(&e);
                    break;
                }
            };

            if self.dispatch(&input) == Dispatch::Exit {
                break;
            }
        }

        Ok(())
    }

    /// Exit status of the last command, or the one `quit` asked for.
    pub fn last_exit_status(&self) -> ExitStatus {
        self.last_exit_status
    }

    /// The status passed to `quit`, if it was entered.
    pub fn requested_exit(&self) -> Option<ExitStatus> {
        self.requested_exit
    }

    pub(crate) fn request_exit(&mut self, status: ExitStatus) {
        info!("exit requested with {}", status);
        self.requested_exit = Some(status);
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.process_table
    }

    pub fn process_table_mut(&mut self) -> &mut ProcessTable {
        &mut self.process_table
    }

    pub(crate) fn editor(&self) -> &Editor {
        &self.editor
    }

    pub(crate) fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    /// Shuts the shell down and ends the process with `n`, else the status
    /// `quit` asked for, else the last command's status. The code is taken
    /// modulo 256, so `quit 500` exits with 244 and `quit -1` with 255.
    pub fn exit(&mut self, n: Option<ExitStatus>) -> ! {
        let code = n
            .or(self.requested_exit)
            .unwrap_or(self.last_exit_status)
            .code()
            .unwrap_or(1);
        let code = code.rem_euclid(256);

        self.shutdown();
        log_if_err!(io::stdout().flush(), "flush stdout");
        info!("tsh has shut down");
        process::exit(code);
    }

    /// Saves history, forgets every tracked process and restores the
    /// shell's signal dispositions. Background processes keep running.
    pub fn shutdown(&mut self) {
        if self.config.enable_command_history {
            if let Some(ref history_file) = self.history_file {
                if let Err(e) = self.editor.save_history(&history_file) {
                    error!(
                        "error: failed to save history to file during shutdown: {}",
                        e
                    );
                }
            }
        }

        self.process_table.teardown();

        match self.signal_disposition.disarm() {
            Ok(disposition) => self.signal_disposition = disposition,
            Err(e) => error!("failed to restore signal dispositions: {}", e),
        }
    }

    fn run_builtin(&mut self, command: &ParsedCommand, stdout: &mut dyn Write) {
        if command.is_pipeline() {
            warn!("builtin {} ignores its pipeline", command.name());
        }

        let (status, result) = match command.output_redirect {
            Some(ref path) => match open_output(path) {
                Ok(mut file) => builtins::run(self, command, &mut file),
                Err(e) => (ExitStatus::from_failure(), Err(e)),
            },
            None => builtins::run(self, command, stdout),
        };

        if let Err(ref e) = result {
            self.report(e);
        }
        self.last_exit_status = status;
    }

    fn execute_command(&mut self, command: ParsedCommand) {
        let result = execute_command::execute(command, &mut self.process_table, self.config.debug);
        self.last_exit_status = match result {
            Ok(status) => status,
            Err(e) => {
                self.report(&e);
                match *e.kind() {
                    ErrorKind::CommandNotFound(_) => {
                        ExitStatus::from_status(COMMAND_NOT_FOUND_EXIT_STATUS)
                    }
                    _ => ExitStatus::from_failure(),
                }
            }
        };
    }

    fn report(&self, e: &Error) {
        error!("{}", e.display_chain());
        eprintln!("tsh: {}", e.display_chain());
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}\nhistory: {:?}\nlast exit status: {:?}\nsignals: {:?}",
            self.process_table,
            self.editor.history(),
            self.last_exit_status,
            self.signal_disposition
        )
    }
}

fn open_output(path: &str) -> Result<File> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .context(ErrorKind::Io)?;
    Ok(file)
}
