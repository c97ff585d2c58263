use crate::shell::builtins::{self, prelude::*};

pub struct History;

impl builtins::BuiltinCommand for History {
    const NAME: &'static str = builtins::HISTORY_NAME;

    const HELP: &'static str = "\
history [-c] [n]
    Display the history list with line numbers. Argument of N
    says to list only the last N lines. The `-c' option causes
    the history list to be cleared by deleting all of the entries.";

    fn run(shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        let arg = builtins::args(command).first().map(String::as_str);
        if arg == Some("-c") {
            shell.editor_mut().clear_history();
            return Ok(());
        }

        let history = shell.editor().history();
        match arg {
            None => write!(stdout, "{}", history).context(ErrorKind::Io)?,
            Some(arg) => {
                let n = arg.parse::<usize>().map_err(|_| {
                    Error::builtin_command(
                        format!("history: {}: nonnegative numeric argument required", arg),
                        1,
                    )
                })?;
                for (number, entry) in history.iter().skip(history.len().saturating_sub(n)) {
                    writeln!(stdout, "\t{}\t{}", number, entry).context(ErrorKind::Io)?;
                }
            }
        }

        Ok(())
    }
}
