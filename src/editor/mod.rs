//! Interactive line input backed by rustyline, paired with the shell's
//! numbered command history.

use std::fmt;
use std::path::Path;

use failure::Fail;
use rustyline::{
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
    CompletionType, Config, Context, Helper,
};

use crate::errors::{ErrorKind, Result};

pub use self::history::CommandHistory;

mod history;

/// Completes file names; no hints, highlighting or validation.
struct LineHelper(FilenameCompleter);

impl Completer for LineHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.0.complete(line, pos, ctx)
    }
}

impl Hinter for LineHelper {
    type Hint = String;
}

impl Highlighter for LineHelper {}

impl Validator for LineHelper {}

impl Helper for LineHelper {}

pub struct Editor {
    reader: rustyline::Editor<LineHelper>,
    history: CommandHistory,
}

impl Editor {
    pub fn with_capacity(history_capacity: usize) -> Editor {
        let config = Config::builder()
            .max_history_size(history_capacity)
            .completion_type(CompletionType::List)
            .build();

        let mut reader = rustyline::Editor::with_config(config);
        reader.set_helper(Some(LineHelper(FilenameCompleter::new())));

        Editor {
            reader,
            history: CommandHistory::with_capacity(history_capacity),
        }
    }

    /// Reads one line. `None` means end of input.
    pub fn readline(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.reader.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            // Ctrl-C abandons the current line only
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(e) => Err(e.context(ErrorKind::Readline).into()),
        }
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Records `line` in the history and makes it reachable with the arrow
    /// keys.
    pub fn record(&mut self, line: &str) {
        if self.history.push(line) {
            self.reader.add_history_entry(line);
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.reader.clear_history();
    }

    pub fn load_history<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.history.load(path)?;
        for (_, entry) in self.history.iter() {
            self.reader.add_history_entry(entry);
        }
        Ok(())
    }

    pub fn save_history<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.history.save(path)
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("history", &self.history)
            .finish()
    }
}
