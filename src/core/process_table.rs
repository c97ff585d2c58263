//! Registry of background processes spawned by the shell and their
//! last-known lifecycle state.

use std::collections::HashMap;
use std::fmt;

use failure::Fail;
use log::{debug, error, warn};
use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::core::parser::ParsedCommand;
use crate::errors::{ErrorKind, Result};

pub const PROCESS_LIST_HEADER: &str = "PID\t\tCommand\t\tSTATUS";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Suspended,
    Terminated,
}

impl ProcessState {
    /// Status string for the process listing; `None` stands for a state the
    /// shell could not determine.
    pub fn describe(state: Option<ProcessState>) -> &'static str {
        match state {
            Some(ProcessState::Running) => "Running",
            Some(ProcessState::Suspended) => "Suspended",
            Some(ProcessState::Terminated) => "Terminated",
            None => "Unknown",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ProcessState::describe(Some(*self)))
    }
}

/// One spawned background process.
#[derive(Debug)]
pub struct ProcessEntry {
    command: ParsedCommand,
    pid: Pid,
    state: ProcessState,
    /// `true` once the OS has reported the process's exit to us.
    reaped: bool,
    /// Insertion order, used for display.
    seq: u64,
}

impl ProcessEntry {
    pub fn command(&self) -> &ParsedCommand {
        &self.command
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Applies the result of a status probe. Returns `false` when the probe
    /// carried no information about this entry.
    fn observe(&mut self, wait_status: &WaitStatus) -> bool {
        let terminated = self.state == ProcessState::Terminated;
        match *wait_status {
            WaitStatus::Exited(..) | WaitStatus::Signaled(..) => {
                self.state = ProcessState::Terminated;
                self.reaped = true;
            }
            // a terminated entry is never revived
            WaitStatus::Stopped(..) if !terminated => self.state = ProcessState::Suspended,
            WaitStatus::Continued(..) if !terminated => self.state = ProcessState::Running,
            _ => return false,
        }
        true
    }
}

/// One row of the `procs` listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessListing {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
}

impl fmt::Display for ProcessListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t\t{}\t{}", self.pid, self.name, self.state)
    }
}

/// Background processes keyed by PID.
///
/// Besides the listed entries the table keeps the PIDs of children that the
/// shell started but does not display: the first stage of a pipeline and
/// pruned entries that were terminated optimistically before the OS reported
/// their exit. Every `reconcile` reaps those without blocking so that no
/// zombie outlives its usefulness.
#[derive(Default)]
pub struct ProcessTable {
    entries: HashMap<Pid, ProcessEntry>,
    unlisted: Vec<Pid>,
    next_seq: u64,
}

impl ProcessTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.entries.get(&pid)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<&ProcessEntry> {
        let mut entries: Vec<&ProcessEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    /// Starts tracking `pid` as a Running process. An existing entry for the
    /// same PID is replaced.
    pub fn register(&mut self, pid: Pid, command: ParsedCommand) {
        debug!("registering {} ({})", pid, command);
        let seq = self.next_seq;
        self.next_seq += 1;
        let previous = self.entries.insert(
            pid,
            ProcessEntry {
                command,
                pid,
                state: ProcessState::Running,
                reaped: false,
                seq,
            },
        );
        if let Some(previous) = previous {
            warn!("replaced stale entry for {}: {}", pid, previous.command);
        }
    }

    /// Hands a child that should be reaped, but not listed, to the table.
    pub fn adopt_unlisted(&mut self, pid: Pid) {
        debug!("adopting unlisted child {}", pid);
        self.unlisted.push(pid);
    }

    /// Overrides the state of `pid`. Unknown PIDs are ignored and
    /// Terminated entries stay in the table until the next `list_and_prune`.
    pub fn update_status(&mut self, pid: Pid, state: ProcessState) {
        match self.entries.get_mut(&pid) {
            Some(entry) => {
                debug!("{}: {} -> {}", pid, entry.state, state);
                entry.state = state;
            }
            None => debug!("{} is not tracked, ignoring status {}", pid, state),
        }
    }

    /// Checks every tracked process for status information, without blocking.
    ///
    /// A PID that is no longer our child keeps its last-known state. Any
    /// other probe failure aborts the pass.
    pub fn reconcile(&mut self) -> Result<()> {
        for entry in self.entries.values_mut().filter(|e| !e.reaped) {
            match probe(entry.pid)? {
                Some(wait_status) => {
                    if entry.observe(&wait_status) {
                        debug!("{} reconciled to {}", entry.pid, entry.state);
                    }
                }
                None => continue,
            }
        }

        self.reap_unlisted();
        Ok(())
    }

    /// Reconciles, lists every entry, then removes the Terminated ones.
    ///
    /// Errors from the reconciliation pass are reported and the listing falls
    /// back to the last-known states.
    pub fn list_and_prune(&mut self) -> Vec<ProcessListing> {
        if let Err(e) = self.reconcile() {
            error!("list_and_prune: {}", e);
            eprintln!("tsh: {}", e.display_chain());
        }

        let listing = self
            .entries()
            .into_iter()
            .map(|e| ProcessListing {
                pid: e.pid,
                name: e.command.name().to_string(),
                state: e.state,
            })
            .collect();

        let terminated: Vec<Pid> = self
            .entries
            .values()
            .filter(|e| e.state == ProcessState::Terminated)
            .map(|e| e.pid)
            .collect();
        for pid in terminated {
            if let Some(entry) = self.entries.remove(&pid) {
                debug!("pruned {} ({})", pid, entry.command);
                if !entry.reaped {
                    self.unlisted.push(pid);
                }
            }
        }

        listing
    }

    /// Releases every remaining entry.
    pub fn teardown(&mut self) {
        debug!(
            "tearing down process table: {} entries, {} unlisted",
            self.entries.len(),
            self.unlisted.len()
        );
        self.entries.clear();
        self.unlisted.clear();
    }

    fn reap_unlisted(&mut self) {
        let mut survivors = Vec::with_capacity(self.unlisted.len());
        for pid in self.unlisted.drain(..) {
            match probe(pid) {
                Ok(Some(WaitStatus::Exited(..))) | Ok(Some(WaitStatus::Signaled(..))) => {
                    debug!("reaped unlisted child {}", pid);
                }
                Ok(Some(_)) | Ok(None) => survivors.push(pid),
                Err(e) => {
                    warn!("dropping unlisted child {}: {}", pid, e);
                }
            }
        }
        self.unlisted = survivors;
    }
}

impl fmt::Debug for ProcessTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} processes\tunlisted: {:?}",
            self.entries.len(),
            self.unlisted
        )?;
        for entry in self.entries() {
            writeln!(f, "{}\t{}\t{}", entry.pid, entry.state, entry.command)?;
        }

        Ok(())
    }
}

/// Non-blocking status probe. `Ok(None)` means "no change": either nothing
/// happened or `pid` is not (or no longer) our child.
fn probe(pid: Pid) -> Result<Option<WaitStatus>> {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    match wait::waitpid(pid, Some(flags)) {
        Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => Ok(None),
        Ok(wait_status) => Ok(Some(wait_status)),
        Err(e) => Err(e.context(ErrorKind::Reconcile(pid)).into()),
    }
}
