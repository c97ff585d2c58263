//! Numbered command history and `!` event expansion.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use failure::{Fail, ResultExt};
use log::debug;

use crate::errors::{Error, ErrorKind, Result};

/// The most recent `capacity` command lines. Entries are numbered from 1 in
/// the order they were recorded; numbers are not reused when the oldest
/// entries fall off.
#[derive(Debug, Default)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    capacity: usize,
    /// Number of entries recorded since the last clear.
    recorded: usize,
}

/// What a `!` designator refers to.
#[derive(Debug, PartialEq, Eq)]
enum Event<'a> {
    /// `!!`
    Last,
    /// `!N`
    Number(usize),
    /// `!-N`
    Back(usize),
    /// `!prefix`
    Prefix(&'a str),
}

impl<'a> Event<'a> {
    fn parse(designator: &'a str) -> Event<'a> {
        if designator == "!" {
            return Event::Last;
        }
        if let Some(back) = designator.strip_prefix('-') {
            if let Ok(n) = back.parse() {
                return Event::Back(n);
            }
        }
        match designator.parse() {
            Ok(n) => Event::Number(n),
            Err(_) => Event::Prefix(designator),
        }
    }
}

impl CommandHistory {
    pub fn with_capacity(capacity: usize) -> CommandHistory {
        CommandHistory {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    /// Records `line`, dropping the oldest entry when full. A line equal to
    /// the most recent entry is not recorded again.
    pub fn push(&mut self, line: &str) -> bool {
        if self.capacity == 0 || self.last() == Some(line) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_owned());
        self.recorded += 1;
        true
    }

    /// Number of the oldest retained entry.
    fn first_number(&self) -> usize {
        self.recorded - self.entries.len() + 1
    }

    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(self.first_number())
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recorded = 0;
    }

    /// Retained entries with their numbers, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let first = self.first_number();
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, e)| (first + i, e.as_str()))
    }

    /// Replaces a line of the form `!designator` with the entry it names.
    /// Other lines, including a lone `!`, are returned unchanged.
    pub fn expand(&self, line: &str) -> Result<String> {
        let designator = match line.strip_prefix('!') {
            Some(designator) if !designator.is_empty() => designator,
            _ => return Ok(line.to_owned()),
        };

        let entry = match Event::parse(designator) {
            Event::Last => self.last(),
            Event::Number(n) => self.get(n),
            Event::Back(n) => (self.recorded + 1)
                .checked_sub(n)
                .filter(|_| n > 0)
                .and_then(|number| self.get(number)),
            Event::Prefix(prefix) => self
                .entries
                .iter()
                .rev()
                .find(|e| e.starts_with(prefix))
                .map(String::as_str),
        };

        match entry {
            Some(entry) => {
                debug!("expanded '{}' to '{}'", line, entry);
                Ok(entry.to_owned())
            }
            None => Err(Error::builtin_command(
                format!("{}: event not found", line),
                1,
            )),
        }
    }

    /// Appends the lines of the file at `path`, one entry per line.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ErrorKind::HistoryFileNotFound.into());
            }
            Err(e) => return Err(e.context(ErrorKind::Io).into()),
        };

        for line in BufReader::new(file).lines() {
            let line = line.context(ErrorKind::Io)?;
            if !line.trim().is_empty() {
                self.push(&line);
            }
        }
        debug!("loaded {} history entries", self.len());
        Ok(())
    }

    /// Writes the retained entries to `path`, replacing its contents.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref()).context(ErrorKind::Io)?);
        for entry in &self.entries {
            writeln!(writer, "{}", entry).context(ErrorKind::Io)?;
        }
        writer.flush().context(ErrorKind::Io)?;
        Ok(())
    }
}

impl fmt::Display for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (number, entry) in self.iter() {
            writeln!(f, "\t{}\t{}", number, entry)?;
        }
        Ok(())
    }
}
