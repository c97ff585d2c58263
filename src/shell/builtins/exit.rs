use crate::shell::builtins::{self, prelude::*};

pub struct Quit;

impl builtins::BuiltinCommand for Quit {
    const NAME: &'static str = builtins::QUIT_NAME;

    const HELP: &'static str = "\
quit [n]
    Exit the shell with a status of N. If N is omitted, the exit status
    is 0. Background processes are left running.";

    fn run(shell: &mut Shell, command: &ParsedCommand, _stdout: &mut dyn Write) -> Result<()> {
        let status_code = builtins::args(command)
            .first()
            .map(|arg| {
                arg.parse::<i32>().unwrap_or_else(|_| {
                    eprintln!("tsh: quit: {}: numeric argument required", arg);
                    2
                })
            })
            .unwrap_or(0);
        shell.request_exit(ExitStatus::from_status(status_code));
        Ok(())
    }
}
