use crate::shell::builtins::{self, prelude::*};
use crate::shell::job_control::{self, JobSignal};

pub struct Alarm;

impl builtins::BuiltinCommand for Alarm {
    const NAME: &'static str = builtins::ALARM_NAME;

    const HELP: &'static str = "\
alarm <pid>
    Resume a suspended process.

    Send SIGCONT to the process identified by PID and mark it Running.

    Exit Status:
    Returns success unless PID is missing or invalid, or the signal cannot
    be delivered.";

    fn run(shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        signal_process::<Self>(shell, command, stdout, JobSignal::Resume)
    }
}

pub struct Blast;

impl builtins::BuiltinCommand for Blast {
    const NAME: &'static str = builtins::BLAST_NAME;

    const HELP: &'static str = "\
blast <pid>
    Terminate a process.

    Send SIGINT to the process identified by PID and mark it Terminated.
    The next `procs' lists it one last time.

    Exit Status:
    Returns success unless PID is missing or invalid, or the signal cannot
    be delivered.";

    fn run(shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        signal_process::<Self>(shell, command, stdout, JobSignal::Terminate)
    }
}

pub struct Sleep;

impl builtins::BuiltinCommand for Sleep {
    const NAME: &'static str = builtins::SLEEP_NAME;

    const HELP: &'static str = "\
sleep <pid>
    Suspend a process.

    Send SIGTSTP to the process identified by PID and mark it Suspended.
    This shadows the sleep program; run it by path, e.g. /bin/sleep.

    Exit Status:
    Returns success unless PID is missing or invalid, or the signal cannot
    be delivered.";

    fn run(shell: &mut Shell, command: &ParsedCommand, stdout: &mut dyn Write) -> Result<()> {
        signal_process::<Self>(shell, command, stdout, JobSignal::Suspend)
    }
}

fn signal_process<B: builtins::BuiltinCommand>(
    shell: &mut Shell,
    command: &ParsedCommand,
    stdout: &mut dyn Write,
    job_signal: JobSignal,
) -> Result<()> {
    let pid = builtins::parse_pid::<B>(command)?;
    job_control::send(shell.process_table_mut(), pid, command, job_signal)?;
    writeln!(stdout, "Process with PID {} {} successfully.", pid, job_signal)
        .context(ErrorKind::Io)?;
    Ok(())
}
