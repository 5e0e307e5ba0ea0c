use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// State shared between the read-eval loop and the builtins.
///
/// The environment contains:
/// - `vars`: a snapshot of the process environment taken at startup. Builtins
///   look variables up here (e.g. `HOME` for `cd`), never in the live process
///   environment, so tests can run with a controlled set.
/// - `current_dir`: the working directory as last set by `cd`.
/// - `should_exit`: set by the `exit` builtin; the read-eval loop stops once
///   it observes the flag.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// An environment with no variables, rooted at the current process directory.
    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
            ..Self::new()
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
