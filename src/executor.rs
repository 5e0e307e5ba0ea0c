//! Runs a [`Pipeline`] as a chain of OS processes.
//!
//! Every stage gets its own child process. Adjacent stages are connected by
//! anonymous pipes; stage `i` reads pipe `i - 1` and writes pipe `i`. Per-stage
//! redirect files are opened by the coordinator and bound to the child's stdio
//! before it is spawned, replacing the pipe end they override.
//!
//! Pipe ends are created close-on-exec, so a child only ever holds the two ends
//! bound to its stdin and stdout. The coordinator drops its own copies right
//! after the last spawn so that end-of-file propagates down the chain.

use crate::builtin::default_builtins;
use crate::command::{COMMAND_NOT_FOUND, CommandFactory, ExitCode, GENERIC_FAILURE};
use crate::env::Environment;
use crate::io_adapters::CaptureBuffer;
use crate::logger::ExecLogger;
use crate::parser::{Command, Pipeline, Redirect, RedirectKind};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, PipeReader, PipeWriter};
use std::process::{Child, Command as ProcessCommand, ExitStatus};

/// Executes pipelines, dispatching single-stage builtins in-process.
pub struct Executor {
    builtins: Vec<Box<dyn CommandFactory>>,
    logger: Option<Box<dyn ExecLogger>>,
}

/// The pipe between stage `i` and stage `i + 1`.
struct PipePair {
    reader: Option<PipeReader>,
    writer: Option<PipeWriter>,
}

enum Stage {
    Running { child: Child, name: String },
    Finished { name: String, status: ExitCode },
}

impl Stage {
    fn label(&self) -> String {
        match self {
            Stage::Running { child, name } => format!("pid {} ({name})", child.id()),
            Stage::Finished { name, .. } => format!("{name} (not started)"),
        }
    }
}

/// A resource failure that stops the remaining stages from being spawned.
struct Aborted;

impl Executor {
    /// Create an executor that recognizes the given builtins.
    pub fn new(builtins: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            builtins,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: impl ExecLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|f| f.handles(name))
    }

    /// Runs `pipeline` and returns the exit status of its last stage.
    pub fn run(&self, pipeline: &Pipeline, env: &mut Environment) -> ExitCode {
        self.execute(pipeline, env, None)
    }

    /// Like [`run`](Self::run), but collects the last stage's standard output
    /// into `buffer` (up to its capacity, trailing line endings stripped).
    ///
    /// A last stage with its own output redirect writes to that file and the
    /// capture stays empty.
    pub fn run_capture(
        &self,
        pipeline: &Pipeline,
        env: &mut Environment,
        buffer: &mut CaptureBuffer,
    ) -> ExitCode {
        buffer.clear();
        let status = self.execute(pipeline, env, Some(&mut *buffer));
        buffer.trim_line_endings();
        status
    }

    fn execute(
        &self,
        pipeline: &Pipeline,
        env: &mut Environment,
        capture: Option<&mut CaptureBuffer>,
    ) -> ExitCode {
        let commands = pipeline.commands();
        if let [single] = commands {
            if let Some(factory) = self.builtins.iter().find(|f| f.handles(single.name())) {
                return self.run_builtin(factory.as_ref(), single, env, capture);
            }
        }
        self.run_processes(commands, capture)
    }

    fn run_builtin(
        &self,
        factory: &dyn CommandFactory,
        cmd: &Command,
        env: &mut Environment,
        capture: Option<&mut CaptureBuffer>,
    ) -> ExitCode {
        self.trace(format_args!("builtin: {}", cmd.name()));
        let args: Vec<&str> = cmd.args().iter().map(String::as_str).collect();
        let Some(builtin) = factory.try_create(cmd.name(), &args) else {
            return GENERIC_FAILURE;
        };

        // Builtins never read stdin, but an unreadable input file still fails the command.
        if let Some(redirect) = &cmd.redirect_in {
            if let Err(e) = self.open_redirect(redirect) {
                report_redirect_error(redirect, &e);
                return GENERIC_FAILURE;
            }
        }

        let result = match (&cmd.redirect_out, capture) {
            (Some(redirect), _) => match self.open_redirect(redirect) {
                Ok(mut file) => builtin.execute(&mut file, env),
                Err(e) => {
                    report_redirect_error(redirect, &e);
                    return GENERIC_FAILURE;
                }
            },
            (None, Some(buffer)) => builtin.execute(buffer, env),
            (None, None) => builtin.execute(&mut io::stdout().lock(), env),
        };

        match result {
            Ok(status) => status,
            Err(e) => {
                eprintln!("shelli: {}: {e:#}", cmd.name());
                GENERIC_FAILURE
            }
        }
    }

    fn run_processes(&self, commands: &[Command], capture: Option<&mut CaptureBuffer>) -> ExitCode {
        let stage_count = commands.len();
        let mut pipes = match self.create_pipes(stage_count.saturating_sub(1)) {
            Ok(pipes) => pipes,
            Err(e) => {
                eprintln!("shelli: pipe: {e}");
                return GENERIC_FAILURE;
            }
        };

        let capture_last = capture.is_some()
            && commands.last().is_some_and(|c| c.redirect_out.is_none());
        let (capture_reader, mut capture_writer) = if capture_last {
            match io::pipe() {
                Ok((reader, writer)) => {
                    self.trace(format_args!("pipe() → capture {}", describe_pipe(&reader, &writer)));
                    (Some(reader), Some(writer))
                }
                Err(e) => {
                    eprintln!("shelli: pipe: {e}");
                    return GENERIC_FAILURE;
                }
            }
        } else {
            (None, None)
        };

        let mut stages = Vec::with_capacity(stage_count);
        for (i, cmd) in commands.iter().enumerate() {
            let stdin_pipe = match i.checked_sub(1) {
                Some(prev) => pipes.get_mut(prev).and_then(|p| p.reader.take()),
                None => None,
            };
            let stdout_pipe = match pipes.get_mut(i) {
                Some(next) => next.writer.take(),
                None => capture_writer.take(),
            };

            match self.spawn_stage(cmd, stdin_pipe, stdout_pipe) {
                Ok(stage) => stages.push(stage),
                Err(Aborted) => {
                    drop(pipes);
                    drop(capture_reader);
                    self.abort(stages);
                    return GENERIC_FAILURE;
                }
            }
        }

        // The children hold their own copies; the coordinator keeps none.
        drop(pipes);
        drop(capture_writer);

        for pair in stages.windows(2) {
            if let [from, to] = pair {
                self.trace(format_args!(
                    "pipe: {} stdout ──► {} stdin",
                    from.label(),
                    to.label()
                ));
            }
        }

        if let (Some(reader), Some(buffer)) = (capture_reader, capture) {
            if let Err(e) = buffer.fill_from(reader) {
                eprintln!("shelli: capture: {e}");
            }
        }

        self.wait_all(stages)
    }

    fn create_pipes(&self, count: usize) -> io::Result<Vec<PipePair>> {
        (0..count)
            .map(|i| {
                let (reader, writer) = io::pipe()?;
                self.trace(format_args!(
                    "pipe() → {} (stage {i} ──► stage {})",
                    describe_pipe(&reader, &writer),
                    i + 1
                ));
                Ok(PipePair {
                    reader: Some(reader),
                    writer: Some(writer),
                })
            })
            .collect()
    }

    /// Spawns one stage with its pipe ends and redirects bound to stdio.
    ///
    /// Redirect and exec failures are reported and recorded as a finished
    /// stage so siblings keep running; only a resource failure aborts.
    fn spawn_stage(
        &self,
        cmd: &Command,
        stdin_pipe: Option<PipeReader>,
        stdout_pipe: Option<PipeWriter>,
    ) -> Result<Stage, Aborted> {
        let name = cmd.name().to_string();
        let mut process = ProcessCommand::new(&name);
        process.args(cmd.args());

        // Pipe bindings first; an explicit redirect replaces (and closes) them.
        if let Some(reader) = stdin_pipe {
            process.stdin(reader);
        }
        if let Some(writer) = stdout_pipe {
            process.stdout(writer);
        }
        for redirect in [&cmd.redirect_in, &cmd.redirect_out].into_iter().flatten() {
            let file = match self.open_redirect(redirect) {
                Ok(file) => file,
                Err(e) => {
                    report_redirect_error(redirect, &e);
                    return Ok(Stage::Finished {
                        name,
                        status: GENERIC_FAILURE,
                    });
                }
            };
            match redirect.kind {
                RedirectKind::Input => process.stdin(file),
                RedirectKind::Output | RedirectKind::Append => process.stdout(file),
            };
        }

        match process.spawn() {
            Ok(child) => {
                self.trace(format_args!("spawn → pid {} ({name})", child.id()));
                Ok(Stage::Running { child, name })
            }
            Err(e) if is_exec_failure(&e) => {
                eprintln!("shelli: {name}: {e}");
                self.trace(format_args!("exec failed: {name} (status {COMMAND_NOT_FOUND})"));
                Ok(Stage::Finished {
                    name,
                    status: COMMAND_NOT_FOUND,
                })
            }
            Err(e) => {
                eprintln!("shelli: spawn {name}: {e}");
                Err(Aborted)
            }
        }
    }

    fn open_redirect(&self, redirect: &Redirect) -> io::Result<File> {
        let file = match redirect.kind {
            RedirectKind::Input => File::open(&redirect.filename)?,
            RedirectKind::Output => output_options().truncate(true).open(&redirect.filename)?,
            RedirectKind::Append => output_options().append(true).open(&redirect.filename)?,
        };
        match redirect.kind {
            RedirectKind::Input => {
                self.trace(format_args!("redirect: stdin ◄── {}", redirect.filename))
            }
            RedirectKind::Output => {
                self.trace(format_args!("redirect: stdout ──► {} (truncate)", redirect.filename))
            }
            RedirectKind::Append => {
                self.trace(format_args!("redirect: stdout ──► {} (append)", redirect.filename))
            }
        }
        Ok(file)
    }

    /// Waits for every stage in spawn order; the last stage decides the status.
    fn wait_all(&self, stages: Vec<Stage>) -> ExitCode {
        let mut last = GENERIC_FAILURE;
        for stage in stages {
            last = match stage {
                Stage::Finished { status, .. } => status,
                Stage::Running { mut child, name } => match child.wait() {
                    Ok(status) => {
                        let code = self.exit_code(&name, status);
                        self.trace(format_args!("wait: pid {} ({name}) → {code}", child.id()));
                        code
                    }
                    Err(e) => {
                        eprintln!("shelli: wait {name}: {e}");
                        GENERIC_FAILURE
                    }
                },
            };
        }
        last
    }

    /// Terminates and reaps the stages spawned before a resource failure.
    fn abort(&self, stages: Vec<Stage>) {
        for stage in stages {
            if let Stage::Running { mut child, name } = stage {
                self.trace(format_args!("abort: killing pid {} ({name})", child.id()));
                // The child may already have exited; reaping it is what matters.
                let _ = child.kill();
                if let Err(e) = child.wait() {
                    log::warn!("failed to reap {name} (pid {}): {e}", child.id());
                }
            }
        }
    }

    fn exit_code(&self, name: &str, status: ExitStatus) -> ExitCode {
        match status.code() {
            Some(code) => code,
            None => {
                self.trace(format_args!("{name} terminated abnormally: {status}"));
                GENERIC_FAILURE
            }
        }
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger.log(&message.to_string());
        }
    }
}

impl Default for Executor {
    /// An executor with the standard builtins and no step logger.
    fn default() -> Self {
        Self::new(default_builtins())
    }
}

fn output_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options
}

fn report_redirect_error(redirect: &Redirect, error: &io::Error) {
    eprintln!("shelli: {}: {error}", redirect.filename);
}

/// Spawn errors that mean "this program cannot be run" rather than "out of resources".
fn is_exec_failure(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::IsADirectory
            | io::ErrorKind::NotADirectory
    )
}

#[cfg(unix)]
fn describe_pipe(reader: &PipeReader, writer: &PipeWriter) -> String {
    use std::os::fd::AsRawFd;
    format!("fd[{}, {}]", reader.as_raw_fd(), writer.as_raw_fd())
}

#[cfg(not(unix))]
fn describe_pipe(_reader: &PipeReader, _writer: &PipeWriter) -> String {
    "pipe".to_string()
}
