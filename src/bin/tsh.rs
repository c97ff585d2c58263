use std::path::PathBuf;
use std::process::{self, ExitStatus};

use docopt::Docopt;
use log::{debug, error};
use nix::unistd::Pid;
use serde_derive::Deserialize;

use tsh::errors::{Error, ErrorKind, Result};
use tsh::{Shell, ShellConfig, TshExitStatusExt};

const COMMAND_HISTORY_CAPACITY: usize = 20;
const LOG_FILE_NAME: &str = ".tsh_log";

const USAGE: &str = "
tsh.

Usage:
    tsh [options]
    tsh [options] -c <command>
    tsh [options] <file>
    tsh (-h | --help)
    tsh --version

Options:
    -h --help       Show this screen.
    --version       Show version.
    -c              If the -c option is present, then commands are read from the first non-option
                        argument command_string.
    -d              Debug mode: report every spawned process on stderr.
    --log=<path>    File to write log to, defaults to ~/.tsh_log
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    arg_file: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_d: bool,
    flag_log: Option<String>,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    init_logger(&args.flag_log);
    debug!("{:?}", args);

    if args.flag_version {
        println!("tsh version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c || args.arg_file.is_some() {
        execute_from_command_string_or_file(&args);
    } else {
        execute_from_stdin(&args);
    }
}

fn init_logger(path: &Option<String>) {
    let log_path = match path.clone().map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => {
            eprintln!("tsh: warning: unable to get home directory, logging disabled");
            return;
        }
    };

    let log_file = match fern::log_file(&log_path) {
        Ok(log_file) => log_file,
        Err(e) => {
            eprintln!(
                "tsh: warning: cannot open log file {}: {}",
                log_path.display(),
                e
            );
            return;
        }
    };

    let pid = Pid::this();
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(log_file)
        .apply();
    if let Err(e) = result {
        eprintln!("tsh: warning: failed to install logger: {}", e);
    }
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

fn execute_from_command_string_or_file(args: &Args) -> ! {
    let shell_config = ShellConfig::noninteractive().with_debug(args.flag_d);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));

    let result = if let Some(ref command) = args.arg_command {
        shell.execute_command_string(command);
        Ok(())
    } else if let Some(ref file_path) = args.arg_file {
        shell.execute_commands_from_file(&file_path)
    } else {
        Err(Error::from(ErrorKind::Docopt))
    };

    exit(result, &mut shell, None);
}

fn execute_from_stdin(args: &Args) -> ! {
    let shell_config = ShellConfig::interactive(COMMAND_HISTORY_CAPACITY).with_debug(args.flag_d);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    let result = shell.execute_from_stdin();
    let status = shell
        .requested_exit()
        .unwrap_or_else(ExitStatus::from_success);
    exit(result, &mut shell, Some(status));
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("tsh: {}", error.display_chain());
    process::exit(ExitStatus::from_failure().code().unwrap_or(1));
}

fn exit(result: Result<()>, shell: &mut Shell, status: Option<ExitStatus>) -> ! {
    if let Err(e) = result {
        error!("{}", e);
        eprintln!("tsh: {}", e.display_chain());
        shell.exit(Some(ExitStatus::from_failure()));
    } else {
        shell.exit(status);
    }
}
