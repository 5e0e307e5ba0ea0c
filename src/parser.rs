//! Turns a [`TokenList`] into a [`Pipeline`].
//!
//! Parsing is a single left-to-right pass. The parser tracks the command
//! currently being filled and whether the next word is a redirect target.

use crate::config::Limits;
use crate::lexer::{Token, TokenList};
use std::fmt;
use thiserror::Error;

/// Kind of redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Input redirection (`<`): read standard input from a file.
    Input,
    /// Output redirection (`>`): write standard output to a file, truncating it.
    Output,
    /// Output redirection with append (`>>`): write standard output to the end of a file.
    Append,
}

impl RedirectKind {
    /// The operator as written on the command line.
    pub fn symbol(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::Append => ">>",
        }
    }
}

/// A request to bind standard input or output of a command to a named file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub filename: String,
}

impl Redirect {
    pub fn new(kind: RedirectKind, filename: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.symbol(), self.filename)
    }
}

/// One program invocation: its words plus optional input and output redirects.
///
/// `argv` is never empty for a command that belongs to a [`Pipeline`]; its
/// first element names the program (or builtin) to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirect_in: Option<Redirect>,
    pub redirect_out: Option<Redirect>,
}

impl Command {
    /// The program name, `argv[0]`.
    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    fn empty() -> Self {
        Self {
            argv: Vec::new(),
            redirect_in: None,
            redirect_out: None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))?;
        if let Some(r) = &self.redirect_in {
            write!(f, " {r}")?;
        }
        if let Some(r) = &self.redirect_out {
            write!(f, " {r}")?;
        }
        Ok(())
    }
}

/// An ordered, non-empty chain of commands whose stdio are connected by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    /// Builds a pipeline from already-constructed commands.
    ///
    /// Returns `None` if `commands` is empty or any command has an empty `argv`.
    pub fn new(commands: Vec<Command>) -> Option<Self> {
        if commands.is_empty() || commands.iter().any(|c| c.argv.is_empty()) {
            return None;
        }
        Some(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of stages; always at least one.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

/// Errors that abort parsing. No pipeline is produced when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A `|` with no command before it (`| wc`, `a || b`).
    #[error("syntax error: unexpected `|`")]
    UnexpectedPipe,
    /// A `|` with no command after it (`ls |`).
    #[error("syntax error: missing command after `|`")]
    DanglingPipe,
    /// A redirect operator before any command word (`> out.txt`).
    #[error("syntax error: redirect without command")]
    RedirectWithoutCommand,
    /// A redirect operator not followed by a filename (`cmd >`, `cmd > | x`).
    #[error("syntax error: missing filename after redirect")]
    MissingRedirectTarget,
    /// A command with more words than the configured cap.
    #[error("too many arguments (limit is {limit})")]
    TooManyArguments { limit: usize },
}

struct PipelineBuilder {
    commands: Vec<Command>,
    current: Option<Command>,
    pending_redirect: Option<RedirectKind>,
    after_pipe: bool,
    max_args: usize,
}

impl PipelineBuilder {
    fn new(limits: &Limits) -> Self {
        Self {
            commands: Vec::new(),
            current: None,
            pending_redirect: None,
            after_pipe: false,
            max_args: limits.max_args,
        }
    }

    fn build(mut self, tokens: TokenList) -> Result<Option<Pipeline>, SyntaxError> {
        for token in tokens {
            match token {
                Token::Word(word) => self.word(word)?,
                Token::Pipe => self.pipe()?,
                Token::RedirectIn => self.redirect(RedirectKind::Input)?,
                Token::RedirectOut => self.redirect(RedirectKind::Output)?,
                Token::RedirectAppend => self.redirect(RedirectKind::Append)?,
                Token::EndOfInput => break,
            }
        }

        if self.pending_redirect.is_some() {
            return Err(SyntaxError::MissingRedirectTarget);
        }
        if self.after_pipe {
            return Err(SyntaxError::DanglingPipe);
        }
        if let Some(cmd) = self.current.take() {
            self.commands.push(cmd);
        }
        Ok(Pipeline::new(self.commands))
    }

    fn word(&mut self, word: String) -> Result<(), SyntaxError> {
        if let Some(kind) = self.pending_redirect.take() {
            // A redirect can only be pending while a command is open.
            if let Some(cmd) = self.current.as_mut() {
                let redirect = Some(Redirect::new(kind, word));
                match kind {
                    RedirectKind::Input => cmd.redirect_in = redirect,
                    RedirectKind::Output | RedirectKind::Append => cmd.redirect_out = redirect,
                }
            }
            return Ok(());
        }

        let cmd = self.current.get_or_insert_with(Command::empty);
        if cmd.argv.len() >= self.max_args {
            return Err(SyntaxError::TooManyArguments {
                limit: self.max_args,
            });
        }
        cmd.argv.push(word);
        self.after_pipe = false;
        Ok(())
    }

    fn pipe(&mut self) -> Result<(), SyntaxError> {
        let Some(cmd) = self.current.take() else {
            return Err(SyntaxError::UnexpectedPipe);
        };
        if self.pending_redirect.is_some() {
            return Err(SyntaxError::MissingRedirectTarget);
        }
        self.commands.push(cmd);
        self.after_pipe = true;
        Ok(())
    }

    fn redirect(&mut self, kind: RedirectKind) -> Result<(), SyntaxError> {
        if self.current.is_none() {
            return Err(SyntaxError::RedirectWithoutCommand);
        }
        // A second operator before the filename replaces the pending one.
        self.pending_redirect = Some(kind);
        Ok(())
    }
}

/// Parses `tokens` using the default [`Limits`].
///
/// Returns `Ok(None)` for a line without any command (empty or blank input).
pub fn parse(tokens: TokenList) -> Result<Option<Pipeline>, SyntaxError> {
    parse_with(tokens, &Limits::default())
}

/// Parses `tokens`, rejecting commands with more than `limits.max_args` words.
pub fn parse_with(tokens: TokenList, limits: &Limits) -> Result<Option<Pipeline>, SyntaxError> {
    PipelineBuilder::new(limits).build(tokens)
}
