use crate::shell::builtins::{self, prelude::*, BuiltinCommand, BUILTINS};

pub struct Help;

impl BuiltinCommand for Help {
    const NAME: &'static str = builtins::HELP_NAME;

    const HELP: &'static str = "\
help [command ...]
    Display helpful information about builtin commands. If COMMAND is specified,
    gives detailed help on all commands matching COMMAND, otherwise a list of the
    builtins is printed.";

    fn run(_shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        let args = builtins::args(command);
        if args.is_empty() {
            for builtin in BUILTINS {
                let usage = builtin.help.lines().next().unwrap_or(builtin.name);
                writeln!(stdout, "{}", usage).context(ErrorKind::Io)?;
            }
            return Ok(());
        }

        let mut all_invalid = true;
        for arg in args {
            if let Some(builtin) = builtins::lookup(arg) {
                writeln!(stdout, "{}", builtin.help).context(ErrorKind::Io)?;
                all_invalid = false;
            }
        }

        if all_invalid {
            let topic = args.last().map(String::as_str).unwrap_or_default();
            return Err(Error::builtin_command(
                format!("help: no help topics match `{}'", topic),
                1,
            ));
        }

        Ok(())
    }
}
