//! Tsh - Tiny Shell
//!
//! A small interactive shell that launches external programs, connects two of
//! them with a pipe, tracks background processes and forwards job-control
//! signals to them.

#![deny(missing_debug_implementations, unused_import_braces)]

/// Logs the error of a `Result` and otherwise ignores it.
macro_rules! log_if_err {
    ($result:expr, $msg:expr) => {
        if let Err(ref e) = $result {
            log::error!("{}: {}", $msg, e);
        }
    };
    ($result:expr, $fmt:expr, $($arg:tt)+) => {
        if let Err(ref e) = $result {
            log::error!("{}: {}", format_args!($fmt, $($arg)+), e);
        }
    };
}

pub mod core;
mod editor;
pub mod errors;
pub mod shell;
mod util;

pub use crate::core::{
    parser::ParsedCommand,
    process_table::{ProcessEntry, ProcessListing, ProcessState, ProcessTable},
};
pub use crate::shell::{Dispatch, Shell, ShellConfig};
pub use crate::util::TshExitStatusExt;
