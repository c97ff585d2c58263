#![allow(dead_code)]

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{self, Command, Stdio};

use tempdir::TempDir;

/// WorkDir represents a scratch directory in which the shell is run. It
/// doubles as the shell's home directory so that history and log files stay
/// inside it.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Creates a fresh, empty directory.
    pub fn new(prefix: &str) -> WorkDir {
        WorkDir {
            dir: TempDir::new(prefix).expect("unable to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("tsh.log")
    }

    /// Creates a file with `contents` inside the directory.
    pub fn create<P: AsRef<Path>>(&self, name: P, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("unable to write file");
        path
    }

    pub fn read<P: AsRef<Path>>(&self, name: P) -> String {
        fs::read_to_string(self.path().join(name)).expect("unable to read file")
    }

    /// Builds a new command to run the shell in this working directory.
    pub fn command<I, S>(&self, args: I) -> process::Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(self.bin());
        cmd.current_dir(self.path());
        cmd.env("HOME", self.path());
        cmd.args(args);
        cmd
    }

    /// Returns path to executable.
    pub fn bin(&self) -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_tsh"))
    }

    /// Runs an interactive session fed from `stdin` and collects its output.
    pub fn session(&self, cmd: &mut process::Command, stdin: &str) -> process::Output {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("unable to spawn tsh");
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(stdin.as_bytes())
            .expect("unable to write to tsh");
        child.wait_with_output().expect("tsh did not finish")
    }
}

pub fn stdout(output: &process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
