//! Step tracing for the executor.
//!
//! The executor reports what it does (pipes created, processes spawned,
//! redirects applied, children reaped) to an [`ExecLogger`] handed to it by
//! the caller. Messages are only produced by the coordinating process, never
//! from inside a child.

/// Receiver of one formatted trace line per execution step.
pub trait ExecLogger {
    fn log(&self, message: &str);
}

impl<F: Fn(&str)> ExecLogger for F {
    fn log(&self, message: &str) {
        self(message)
    }
}

/// Forwards trace lines to the `log` facade at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepLogger;

impl StepLogger {
    pub const TARGET: &'static str = "shelli::exec";
}

impl ExecLogger for StepLogger {
    fn log(&self, message: &str) {
        log::debug!(target: Self::TARGET, "{message}");
    }
}
