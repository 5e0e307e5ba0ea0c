//! A small shell that runs pipelines of programs with redirections.
//!
//! A command line goes through three stages:
//!
//! 1. [`lexer::tokenize`] splits it into [`Token`]s, honouring `'...'` and
//!    `"..."` quoting and the operators `|`, `<`, `>` and `>>`.
//! 2. [`parser::parse`] turns the tokens into a [`Pipeline`] of [`Command`]s,
//!    each with optional input and output redirects.
//! 3. [`Executor`] spawns one process per stage, wires adjacent stages with
//!    pipes, applies redirects and reports the exit status of the last stage.
//!    Single-stage builtins (`cd`, `pwd`, `exit`, `help`) run in-process.
//!
//! [`Interpreter`] ties the stages together into a read-eval loop.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod executor;
pub mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod logger;
pub mod parser;

pub use builtin::{HELP_TEXT, default_builtins};
pub use command::ExitCode;
pub use config::Limits;
pub use executor::Executor;
pub use interpreter::{Interpreter, LineError};
pub use io_adapters::CaptureBuffer;
pub use lexer::{LexError, Token, TokenList};
pub use logger::{ExecLogger, StepLogger};
pub use parser::{Command, Pipeline, Redirect, RedirectKind, SyntaxError};
