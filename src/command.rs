use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Process exit status; 0 is success.
pub type ExitCode = i32;

/// Status reported when a stage fails for a reason other than its own exit code.
pub const GENERIC_FAILURE: ExitCode = 1;

/// Status of a stage whose program could not be executed.
pub const COMMAND_NOT_FOUND: ExitCode = 127;

/// A command that runs inside the coordinating process.
///
/// Builtins never read standard input. Their output goes to `stdout`, which
/// may be the terminal, a redirect target, or a capture buffer. Requests to
/// leave the read-eval loop are signalled through [`Environment::should_exit`].
pub trait ExecutableCommand {
    /// Executes the command and returns its exit status.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Factory that creates a builtin from a name and its arguments.
///
/// The executor asks every registered factory whether it [`handles`] the
/// program name of a single-stage pipeline; the first one that does runs the
/// command in-process instead of spawning a child.
///
/// [`handles`]: CommandFactory::handles
pub trait CommandFactory {
    /// Name under which this builtin is invoked, e.g. `"cd"`.
    fn name(&self) -> &'static str;

    fn handles(&self, name: &str) -> bool {
        self.name() == name
    }

    /// Attempt to create a command instance for the provided name and arguments.
    ///
    /// Returns `None` when the factory doesn't recognize the `name`.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
