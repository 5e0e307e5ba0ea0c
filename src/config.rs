use argh::FromArgs;

/// Default cap on the number of words in a single command.
pub const DEFAULT_MAX_ARGS: usize = 256;

/// Default cap on the length (in characters) of a single word.
pub const DEFAULT_MAX_WORD_LEN: usize = 1023;

/// Suggested capacity for [`crate::Interpreter::eval_line_capture`] buffers.
pub const DEFAULT_CAPTURE_CAPACITY: usize = 1024;

/// Input-size limits enforced by the lexer and the parser.
///
/// Both limits are hard errors: a word longer than `max_word_len` is rejected
/// by the lexer and a command with more than `max_args` words is rejected by
/// the parser. Nothing is silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_args: usize,
    pub max_word_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_args: DEFAULT_MAX_ARGS,
            max_word_len: DEFAULT_MAX_WORD_LEN,
        }
    }
}

#[derive(FromArgs, Debug)]
/// shelli: a small shell that runs pipelines of programs with redirections.
pub struct Options {
    #[argh(switch)]
    /// trace every execution step (tokens, pipeline, pipes, spawns) to stderr.
    pub debug: bool,

    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status.
    pub command: Option<String>,

    #[argh(option, default = "DEFAULT_MAX_ARGS")]
    /// maximum number of words per command.
    pub max_args: usize,

    #[argh(option, default = "DEFAULT_MAX_WORD_LEN")]
    /// maximum length of a single word, in characters.
    pub max_word_len: usize,
}

impl Options {
    pub fn limits(&self) -> Limits {
        Limits {
            max_args: self.max_args,
            max_word_len: self.max_word_len,
        }
    }

    /// Default `log` filter for this run; `RUST_LOG` still takes precedence.
    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_builtin_limits() {
        let opts = Options::from_args(&["shelli"], &[]).expect("parse empty args");
        assert!(!opts.debug);
        assert_eq!(opts.command, None);
        assert_eq!(opts.limits(), Limits::default());
        assert_eq!(opts.log_filter(), "warn");
    }

    #[test]
    fn options_parse_command_and_limits() {
        let opts = Options::from_args(
            &["shelli"],
            &["--debug", "-c", "echo hi | wc -c", "--max-args", "8"],
        )
        .expect("parse args");
        assert!(opts.debug);
        assert_eq!(opts.command.as_deref(), Some("echo hi | wc -c"));
        assert_eq!(opts.limits().max_args, 8);
        assert_eq!(opts.limits().max_word_len, DEFAULT_MAX_WORD_LEN);
        assert_eq!(opts.log_filter(), "debug");
    }
}
