//! TSH Parser
//!
//! Turns one input line into a [`ParsedCommand`]: an argument list, optional
//! input/output redirection, an optional second pipeline stage and whether
//! the command runs in the foreground.

use std::fmt;
use std::vec::IntoIter;

use log::debug;

use crate::errors::{Error, Result};

/// Represents all information associated with one stage of a user's input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The program followed by its arguments.
    pub arguments: Vec<String>,
    /// The file to read stdin from, if one is specified
    pub input_redirect: Option<String>,
    /// The file to write stdout to, if one is specified
    pub output_redirect: Option<String>,
    /// Second stage of a pipeline, reading this stage's stdout.
    pub next: Option<Box<ParsedCommand>>,
    /// `false` when the line ended with `&`.
    pub foreground: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Less,
    Greater,
    Pipe,
    Ampersand,
}

impl ParsedCommand {
    /// Creates a foreground command without redirection.
    pub fn new<S: AsRef<str>>(arguments: &[S]) -> Self {
        ParsedCommandBuilder::new().args(arguments).build()
    }

    /// Parses input string into a ParsedCommand.
    ///
    /// Returns `Ok(None)` when the line is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsh::ParsedCommand;
    ///
    /// let command = ParsedCommand::parse("ls -l | wc -l > count &").unwrap().unwrap();
    /// assert_eq!(command.arguments, vec!["ls", "-l"]);
    /// assert!(!command.foreground);
    ///
    /// let second = command.next.unwrap();
    /// assert_eq!(second.arguments, vec!["wc", "-l"]);
    /// assert_eq!(second.output_redirect, Some("count".to_string()));
    /// ```
    pub fn parse(input: &str) -> Result<Option<ParsedCommand>> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut first = ParsedCommandBuilder::new();
        let mut second: Option<ParsedCommandBuilder> = None;
        let mut foreground = true;
        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            if !foreground {
                // `&` must be the last token
                return Err(Error::syntax(input));
            }

            let stage = match second {
                Some(ref mut second) => second,
                None => &mut first,
            };
            match token {
                Token::Word(word) => stage.arg(word),
                Token::Less => {
                    let target = redirect_target(&mut tokens, input)?;
                    stage.input_redirect(target)
                }
                Token::Greater => {
                    let target = redirect_target(&mut tokens, input)?;
                    stage.output_redirect(target)
                }
                Token::Pipe => {
                    if stage.is_empty() || second.is_some() {
                        return Err(Error::syntax(input));
                    }
                    second = Some(ParsedCommandBuilder::new());
                }
                Token::Ampersand => foreground = false,
            }
        }

        if first.is_empty() || second.as_ref().map_or(false, ParsedCommandBuilder::is_empty) {
            return Err(Error::syntax(input));
        }

        if let Some(mut second) = second {
            // the pipe owns the first stage's stdout and the second's stdin
            if first.output_redirect.is_some() || second.input_redirect.is_some() {
                return Err(Error::syntax(input));
            }
            second.foreground(foreground);
            first.next(second.build());
        }
        first.foreground(foreground);

        let command = first.build();
        debug!("parsed command: {}", command);
        Ok(Some(command))
    }

    /// The program name, i.e. the first argument.
    pub fn name(&self) -> &str {
        self.arguments.first().map(String::as_str).unwrap_or("")
    }

    /// Returns `true` if this command pipes its output into a second stage.
    pub fn is_pipeline(&self) -> bool {
        self.next.is_some()
    }

    fn fmt_stage(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.arguments.iter().map(|a| quote(a)).collect();
        write!(f, "{}", words.join(" "))?;
        if let Some(ref input) = self.input_redirect {
            write!(f, " < {}", quote(input))?;
        }
        if let Some(ref output) = self.output_redirect {
            write!(f, " > {}", quote(output))?;
        }
        if let Some(ref next) = self.next {
            write!(f, " | ")?;
            next.fmt_stage(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_stage(f)?;
        if !self.foreground {
            write!(f, " &")?;
        }
        Ok(())
    }
}

/// Builds ParsedCommands.
#[derive(Clone, Debug)]
pub struct ParsedCommandBuilder {
    arguments: Vec<String>,
    input_redirect: Option<String>,
    output_redirect: Option<String>,
    next: Option<ParsedCommand>,
    foreground: bool,
}

impl ParsedCommandBuilder {
    /// Construct a new `ParsedCommandBuilder` with the following default
    /// configuration:
    ///
    /// * No arguments
    /// * No input/output redirection
    /// * No second stage
    /// * Runs in foreground
    pub fn new() -> ParsedCommandBuilder {
        ParsedCommandBuilder {
            arguments: Vec::new(),
            input_redirect: None,
            output_redirect: None,
            next: None,
            foreground: true,
        }
    }

    /// Add arguments, the first one being the program.
    pub fn args<S: AsRef<str>>(mut self, args: &[S]) -> ParsedCommandBuilder {
        self.arguments
            .extend(args.iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Redirect stdin from the specified filename.
    pub fn stdin<S: Into<String>>(mut self, filename: S) -> ParsedCommandBuilder {
        self.input_redirect(filename.into());
        self
    }

    /// Redirect stdout to the specified filename.
    pub fn stdout<S: Into<String>>(mut self, filename: S) -> ParsedCommandBuilder {
        self.output_redirect(filename.into());
        self
    }

    /// Pipe stdout into `next`.
    pub fn pipe(mut self, next: ParsedCommand) -> ParsedCommandBuilder {
        self.next(next);
        self
    }

    /// Configure the command to run in the background.
    pub fn background(mut self) -> ParsedCommandBuilder {
        self.foreground(false);
        self
    }

    /// Consumes the builder to build the final command.
    pub fn build(self) -> ParsedCommand {
        ParsedCommand {
            arguments: self.arguments,
            input_redirect: self.input_redirect,
            output_redirect: self.output_redirect,
            next: self.next.map(Box::new),
            foreground: self.foreground,
        }
    }

    fn arg(&mut self, arg: String) {
        self.arguments.push(arg);
    }

    fn input_redirect(&mut self, filename: String) {
        self.input_redirect = Some(filename);
    }

    fn output_redirect(&mut self, filename: String) {
        self.output_redirect = Some(filename);
    }

    fn next(&mut self, next: ParsedCommand) {
        self.next = Some(next);
    }

    fn foreground(&mut self, foreground: bool) {
        self.foreground = foreground;
        if let Some(ref mut next) = self.next {
            next.foreground = foreground;
        }
    }

    fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

impl Default for ParsedCommandBuilder {
    fn default() -> Self {
        ParsedCommandBuilder::new()
    }
}

fn redirect_target(tokens: &mut IntoIter<Token>, input: &str) -> Result<String> {
    match tokens.next() {
        Some(Token::Word(target)) => Ok(target),
        _ => Err(Error::syntax(input)),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    // quoted empty strings are still words
    let mut in_word = false;

    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(other) => word.push(other),
                        None => return Err(Error::syntax(input)),
                    }
                }
            }
            '<' | '>' | '|' | '&' => {
                end_word(&mut tokens, &mut word, &mut in_word);
                tokens.push(match c {
                    '<' => Token::Less,
                    '>' => Token::Greater,
                    '|' => Token::Pipe,
                    _ => Token::Ampersand,
                });
            }
            c if c.is_whitespace() => end_word(&mut tokens, &mut word, &mut in_word),
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    end_word(&mut tokens, &mut word, &mut in_word);

    Ok(tokens)
}

fn end_word(tokens: &mut Vec<Token>, word: &mut String, in_word: &mut bool) {
    if *in_word {
        tokens.push(Token::Word(word.split_off(0)));
        *in_word = false;
    }
}

fn quote(word: &str) -> String {
    let special = |c: char| c.is_whitespace() || "<>|&'\"".contains(c);
    if word.is_empty() || word.contains(special) {
        format!("'{}'", word)
    } else {
        word.to_string()
    }
}
