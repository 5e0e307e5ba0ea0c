use crate::command::{CommandFactory, ExecutableCommand, ExitCode, GENERIC_FAILURE};
use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// Text printed by the `help` builtin.
pub const HELP_TEXT: &str = "\
shelli - a small shell for pipelines and redirections

Built-in commands:
  cd [dir]    Change directory (default: $HOME)
  pwd         Print working directory
  exit [n]    Exit shell with status n (default: 0)
  help        Show this help message

Features:
  - Pipes: cmd1 | cmd2 | cmd3
  - Redirects: cmd < in.txt, cmd > out.txt, cmd >> log.txt
  - Quoting: 'single quotes', \"double quotes\"

Debug mode:
  Run with --debug to trace every execution step
";

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let result = <T as BuiltinCommand>::execute(*self, stdout, env);
        stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => {
                eprintln!("{e:#}");
                Ok(GENERIC_FAILURE)
            }
        }
    }
}

/// Outcome of argh rejecting the arguments, or of an explicit `--help`.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.is_error {
            eprintln!("{}", self.output.trim_end());
            Ok(GENERIC_FAILURE)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

/// Factory allows creating instances of a [`BuiltinCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        // Operands such as `exit -1` or `cd -dir` must not be read as flags.
        let operands: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
        Some(match T::from_args(&[name], &operands) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// The builtin set: `cd`, `pwd`, `exit` and `help`.
pub fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Help>::default()),
    ]
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = env::current_dir().context("pwd")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    /// Only the first operand is used.
    pub target: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.target.into_iter().next() {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(anyhow!("cd: HOME not set")),
            },
        };

        env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
        env.current_dir = env::current_dir().unwrap_or(target);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell with the given status (default: 0).
pub struct Exit {
    #[argh(positional, greedy)]
    /// exit status to report; operands after the first are ignored.
    pub status: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        match self.status.into_iter().next() {
            None => Ok(0),
            Some(s) => match s.trim().parse::<ExitCode>() {
                Ok(status) => Ok(status),
                Err(_) => {
                    eprintln!("exit: {s}: numeric argument required");
                    Ok(2)
                }
            },
        }
    }
}

#[derive(FromArgs)]
/// Show the list of builtins and supported syntax.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        stdout.write_all(HELP_TEXT.as_bytes())?;
        Ok(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or change the process working directory.
    pub(crate) static CWD_LOCK: Mutex<()> = Mutex::new(());

    fn run(name: &str, args: &[&str], env: &mut Environment) -> (ExitCode, String) {
        let factories = default_builtins();
        let cmd = factories
            .iter()
            .find_map(|f| f.try_create(name, args))
            .expect("builtin should exist");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, env).expect("builtin should not error");
        (code, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn registry_knows_exactly_the_four_builtins() {
        let factories = default_builtins();
        let names: Vec<_> = factories.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["cd", "pwd", "exit", "help"]);
        assert!(factories.iter().any(|f| f.handles("cd")));
        assert!(!factories.iter().any(|f| f.handles("ls")));
        assert!(factories.iter().all(|f| f.try_create("ls", &[]).is_none()));
    }

    #[test]
    fn pwd_prints_process_cwd() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut env = Environment::empty();
        let (code, out) = run("pwd", &[], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out.trim_end(), env::current_dir().unwrap().display().to_string());
    }

    #[test]
    fn cd_to_missing_dir_fails_and_keeps_cwd() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let mut env = Environment::empty();
        let (code, out) = run("cd", &["/definitely/not/a/real/dir"], &mut env);
        assert_ne!(code, 0);
        assert!(out.is_empty());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn cd_without_home_fails() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let mut env = Environment::empty();
        let (code, _) = run("cd", &[], &mut env);
        assert_eq!(code, 1);
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn cd_changes_process_directory() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::empty();
        env.set_var("HOME", dir.path().to_string_lossy());

        let (code, _) = run("cd", &[], &mut env);
        let after = env::current_dir().unwrap();
        env::set_current_dir(&before).unwrap();

        assert_eq!(code, 0);
        assert_eq!(after, dir.path().canonicalize().unwrap());
        assert_eq!(env.current_dir, after);
    }

    #[test]
    fn exit_requests_termination_with_status() {
        let mut env = Environment::empty();
        assert_eq!(run("exit", &[], &mut env).0, 0);
        assert!(env.should_exit);

        let mut env = Environment::empty();
        assert_eq!(run("exit", &["3"], &mut env).0, 3);
        assert!(env.should_exit);

        let mut env = Environment::empty();
        assert_eq!(run("exit", &["soon"], &mut env).0, 2);
        assert!(env.should_exit);
    }

    #[test]
    fn help_prints_usage() {
        let mut env = Environment::empty();
        let (code, out) = run("help", &[], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, HELP_TEXT);
        assert!(!env.should_exit);
    }

    #[test]
    fn exit_takes_dash_operands_and_ignores_extras() {
        let mut env = Environment::empty();
        assert_eq!(run("exit", &["-1"], &mut env).0, -1);
        assert!(env.should_exit);

        let mut env = Environment::empty();
        assert_eq!(run("exit", &["3", "4"], &mut env).0, 3);
        assert!(env.should_exit);

        let mut env = Environment::empty();
        assert_eq!(run("exit", &["--help"], &mut env).0, 2);
        assert!(env.should_exit);
    }

    #[test]
    fn cd_accepts_directory_names_starting_with_dash() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("-sub");
        std::fs::create_dir(&target).unwrap();
        env::set_current_dir(dir.path()).unwrap();

        let mut env = Environment::empty();
        let (code, _) = run("cd", &["-sub", "ignored"], &mut env);
        let after = env::current_dir().unwrap();
        env::set_current_dir(&before).unwrap();

        assert_eq!(code, 0);
        assert_eq!(after, target.canonicalize().unwrap());
    }

    #[test]
    fn pwd_and_help_ignore_operands() {
        let _guard = CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut env = Environment::empty();
        assert_eq!(run("pwd", &["-L", "extra"], &mut env).0, 0);
        let (code, out) = run("help", &["help"], &mut env);
        assert_eq!(code, 0);
        assert_eq!(out, HELP_TEXT);
    }

    #[derive(FromArgs)]
    /// Takes no operands.
    struct Bare {}

    impl BuiltinCommand for Bare {
        fn name() -> &'static str {
            "bare"
        }

        fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
            Ok(0)
        }
    }

    #[test]
    fn rejected_operands_fail_without_running() {
        let factory = Factory::<Bare>::default();
        let cmd = factory.try_create("bare", &["x"]).expect("name matches");
        let mut out = Vec::new();
        let code = cmd.execute(&mut out, &mut Environment::empty()).unwrap();
        assert_eq!(code, GENERIC_FAILURE);
        assert!(out.is_empty());
    }
}
