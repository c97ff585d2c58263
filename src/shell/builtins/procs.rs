use crate::core::process_table::PROCESS_LIST_HEADER;
use crate::shell::builtins::{self, prelude::*};

pub struct Procs;

impl builtins::BuiltinCommand for Procs {
    const NAME: &'static str = builtins::PROCS_NAME;

    const HELP: &'static str = "\
procs
    Display status of background processes.

    Lists the PID, command name and status of every process started in the
    background. Terminated processes are listed once and then forgotten.

    Exit Status:
    Returns success unless an output error occurs.";

    fn run(shell: &mut Shell, _command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        let listing = shell.process_table_mut().list_and_prune();

        writeln!(stdout, "{}", PROCESS_LIST_HEADER).context(ErrorKind::Io)?;
        for row in listing {
            writeln!(stdout, "{}", row).context(ErrorKind::Io)?;
        }

        Ok(())
    }
}
