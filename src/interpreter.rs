use crate::command::ExitCode;
use crate::config::Limits;
use crate::env::Environment;
use crate::executor::Executor;
use crate::io_adapters::CaptureBuffer;
use crate::lexer::{self, LexError};
use crate::logger::StepLogger;
use crate::parser::{self, Pipeline, SyntaxError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Prompt shown by [`Interpreter::repl`].
pub const PROMPT: &str = "shelli$ ";

/// A line that was rejected before anything ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// A line-oriented shell: lexes, parses and executes one command line at a time.
///
/// The interpreter owns the [`Environment`] shared with builtins and an
/// [`Executor`]. Its interrupt flag is raised by a Ctrl-C handler installed by
/// the binary and is only observed between input lines.
///
/// Example
/// ```no_run
/// use shelli::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.eval_line("echo hello | wc -c").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    executor: Executor,
    limits: Limits,
    interrupted: Arc<AtomicBool>,
    last_status: ExitCode,
}

impl Interpreter {
    pub fn new(executor: Executor, limits: Limits) -> Self {
        Self {
            env: Environment::new(),
            executor,
            limits,
            interrupted: Arc::new(AtomicBool::new(false)),
            last_status: 0,
        }
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Flag to raise from a signal handler; cleared by the read-eval loop.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Status of the most recently executed pipeline.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Lexes and parses `line`. `Ok(None)` means there was nothing to run.
    pub fn parse_line(&self, line: &str) -> Result<Option<Pipeline>, LineError> {
        let tokens = lexer::tokenize_with(line, &self.limits)?;
        log::debug!("tokens: {tokens}");
        let pipeline = parser::parse_with(tokens, &self.limits)?;
        if let Some(pipeline) = &pipeline {
            log::debug!("pipeline ({} stage(s)): {pipeline}", pipeline.len());
        }
        Ok(pipeline)
    }

    /// Runs one command line with output going to the terminal.
    ///
    /// An empty line succeeds without changing the last status.
    pub fn eval_line(&mut self, line: &str) -> Result<ExitCode, LineError> {
        let Some(pipeline) = self.parse_line(line)? else {
            return Ok(self.last_status);
        };
        self.last_status = self.executor.run(&pipeline, &mut self.env);
        log::debug!("exit status: {}", self.last_status);
        Ok(self.last_status)
    }

    /// Runs one command line, capturing up to `capacity` bytes of its output.
    pub fn eval_line_capture(
        &mut self,
        line: &str,
        capacity: usize,
    ) -> Result<(ExitCode, CaptureBuffer), LineError> {
        let mut buffer = CaptureBuffer::with_capacity(capacity);
        let Some(pipeline) = self.parse_line(line)? else {
            return Ok((self.last_status, buffer));
        };
        self.last_status = self.executor.run_capture(&pipeline, &mut self.env, &mut buffer);
        log::debug!("exit status: {}, captured {} byte(s)", self.last_status, buffer.len());
        Ok((self.last_status, buffer))
    }

    /// Interactive read-eval loop. Returns the status of the last pipeline run.
    pub fn repl(&mut self) -> rustyline::Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;

        while !self.should_exit() {
            if self.interrupted.swap(false, Ordering::SeqCst) {
                log::debug!("interrupt observed between lines");
            }

            let line = match rl.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            };
            if line.trim().is_empty() {
                continue;
            }
            rl.add_history_entry(line.as_str())?;

            if let Err(e) = self.eval_line(&line) {
                eprintln!("shelli: {e}");
            }
        }

        Ok(self.last_status)
    }
}

impl Default for Interpreter {
    /// The standard builtins, default limits and step tracing through `log`.
    fn default() -> Self {
        Self::new(Executor::default().with_logger(StepLogger), Limits::default())
    }
}
