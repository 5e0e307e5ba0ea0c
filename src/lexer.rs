//! Lexical analysis of a single command line.
//!
//! The lexer is a small finite state machine over characters. Words are
//! separated by whitespace and by the operator characters `|`, `<` and `>`.
//! Quoted segments (`'...'` or `"..."`) are glued to the surrounding word,
//! so `a'b c'd` is the single word `ab cd`. There is no escape character.

use crate::config::Limits;
use std::fmt;
use thiserror::Error;

/// A token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A command name, argument or redirect target.
    Word(String),
    /// The pipe operator, `|`.
    Pipe,
    /// Input redirection, `<`.
    RedirectIn,
    /// Output redirection that truncates the target, `>`.
    RedirectOut,
    /// Output redirection that appends to the target, `>>`.
    RedirectAppend,
    /// Sentinel terminating every [`TokenList`].
    EndOfInput,
}

impl Token {
    /// Short upper-case name of the token kind, as shown in traces.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Word(_) => "WORD",
            Token::Pipe => "PIPE",
            Token::RedirectIn => "REDIR_IN",
            Token::RedirectOut => "REDIR_OUT",
            Token::RedirectAppend => "REDIR_APP",
            Token::EndOfInput => "EOF",
        }
    }

    /// The text carried by a `Word` token; operators carry none.
    pub fn value(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "WORD({w:?})"),
            other => f.write_str(other.kind_name()),
        }
    }
}

/// Ordered tokens of one input line, always terminated by [`Token::EndOfInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens, including the trailing `EndOfInput`.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the line held nothing but the `EndOfInput` sentinel.
    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}

impl IntoIterator for TokenList {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Errors that can occur during the lexical analysis process.
///
/// On error no tokens are returned at all; the whole line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    /// A word grew beyond the configured maximum length.
    #[error("word exceeds {limit} characters")]
    WordTooLong { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    InWord,
    InSingleQuote,
    InDoubleQuote,
}

struct LexingFSM<'a> {
    input: std::iter::Peekable<std::str::Chars<'a>>,
    state: LexingState,
    word: String,
    word_len: usize,
    out: Vec<Token>,
    max_word_len: usize,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str, limits: &Limits) -> Self {
        LexingFSM {
            input: line.chars().peekable(),
            state: LexingState::Start,
            word: String::new(),
            word_len: 0,
            out: Vec::new(),
            max_word_len: limits.max_word_len,
        }
    }

    fn make_tokens(mut self) -> Result<TokenList, LexError> {
        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start => self.handle_start(ch)?,
                LexingState::InWord => self.handle_word(ch)?,
                LexingState::InSingleQuote => self.handle_quoted(ch, '\'')?,
                LexingState::InDoubleQuote => self.handle_quoted(ch, '"')?,
            }
        }

        match self.state {
            LexingState::InSingleQuote => return Err(LexError::UnterminatedQuote('\'')),
            LexingState::InDoubleQuote => return Err(LexError::UnterminatedQuote('"')),
            LexingState::InWord => self.finish_word(),
            LexingState::Start => {}
        }

        self.out.push(Token::EndOfInput);
        Ok(TokenList { tokens: self.out })
    }

    fn handle_start(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            c if c.is_whitespace() => {}
            '|' => self.out.push(Token::Pipe),
            '<' => self.out.push(Token::RedirectIn),
            '>' => {
                if self.input.peek() == Some(&'>') {
                    self.input.next();
                    self.out.push(Token::RedirectAppend);
                } else {
                    self.out.push(Token::RedirectOut);
                }
            }
            // An opening quote starts a word even if the quoted text is empty.
            '\'' => self.state = LexingState::InSingleQuote,
            '"' => self.state = LexingState::InDoubleQuote,
            c => {
                self.push_char(c)?;
                self.state = LexingState::InWord;
            }
        }
        Ok(())
    }

    fn handle_word(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            c if c.is_whitespace() => self.finish_word(),
            '|' | '<' | '>' => {
                self.finish_word();
                self.handle_start(ch)?;
            }
            '\'' => self.state = LexingState::InSingleQuote,
            '"' => self.state = LexingState::InDoubleQuote,
            c => self.push_char(c)?,
        }
        Ok(())
    }

    fn handle_quoted(&mut self, ch: char, quote: char) -> Result<(), LexError> {
        if ch == quote {
            self.state = LexingState::InWord;
            Ok(())
        } else {
            self.push_char(ch)
        }
    }

    fn push_char(&mut self, ch: char) -> Result<(), LexError> {
        if self.word_len >= self.max_word_len {
            return Err(LexError::WordTooLong {
                limit: self.max_word_len,
            });
        }
        self.word.push(ch);
        self.word_len += 1;
        Ok(())
    }

    fn finish_word(&mut self) {
        self.out.push(Token::Word(std::mem::take(&mut self.word)));
        self.word_len = 0;
        self.state = LexingState::Start;
    }
}

/// Tokenizes `line` using the default [`Limits`].
pub fn tokenize(line: &str) -> Result<TokenList, LexError> {
    tokenize_with(line, &Limits::default())
}

/// Tokenizes `line`, rejecting words longer than `limits.max_word_len`.
pub fn tokenize_with(line: &str, limits: &Limits) -> Result<TokenList, LexError> {
    LexingFSM::new(line, limits).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn pipeline_with_redirect() {
        let tokens = tokenize("echo hi | wc -l > out.txt").unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[
                word("echo"),
                word("hi"),
                Token::Pipe,
                word("wc"),
                word("-l"),
                Token::RedirectOut,
                word("out.txt"),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn quotes_keep_spaces_inside_words() {
        let tokens = tokenize("echo \"a b\" 'c d'").unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[word("echo"), word("a b"), word("c d"), Token::EndOfInput]
        );
    }

    #[test]
    fn quoted_segments_concatenate() {
        let tokens = tokenize("a'b c'd \"x\"y'z'").unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[word("ab cd"), word("xyz"), Token::EndOfInput]
        );
    }

    #[test]
    fn quotes_do_not_interpret_operators_or_backslashes() {
        let tokens = tokenize(r#"echo "a|b>c" 'd\n'"#).unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[word("echo"), word("a|b>c"), word("d\\n"), Token::EndOfInput]
        );
    }

    #[test]
    fn operators_split_words_without_spaces() {
        let tokens = tokenize("cat<in|sort>>log").unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[
                word("cat"),
                Token::RedirectIn,
                word("in"),
                Token::Pipe,
                word("sort"),
                Token::RedirectAppend,
                word("log"),
                Token::EndOfInput,
            ]
        );
    }

    #[test]
    fn empty_quotes_produce_an_empty_word() {
        let tokens = tokenize("printf ''").unwrap();
        assert_eq!(
            tokens.as_slice(),
            &[word("printf"), word(""), Token::EndOfInput]
        );
    }

    #[test]
    fn unterminated_quote_rejects_the_line() {
        assert_eq!(
            tokenize("echo \"unterminated"),
            Err(LexError::UnterminatedQuote('"'))
        );
        assert_eq!(
            tokenize("echo ok 'still open"),
            Err(LexError::UnterminatedQuote('\''))
        );
    }

    #[test]
    fn empty_and_blank_lines_yield_only_the_sentinel() {
        for line in ["", "   \t  "] {
            let tokens = tokenize(line).unwrap();
            assert!(tokens.is_empty());
            assert_eq!(tokens.as_slice(), &[Token::EndOfInput]);
        }
    }

    #[test]
    fn overlong_word_is_an_error() {
        let limits = Limits {
            max_word_len: 4,
            ..Limits::default()
        };
        assert!(tokenize_with("abcd", &limits).is_ok());
        assert_eq!(
            tokenize_with("ok abcde", &limits),
            Err(LexError::WordTooLong { limit: 4 })
        );
        assert_eq!(
            tokenize_with("'ab''cde'", &limits),
            Err(LexError::WordTooLong { limit: 4 })
        );
    }

    #[test]
    fn display_lists_kinds_and_values() {
        let tokens = tokenize("ls >> x").unwrap();
        assert_eq!(
            tokens.to_string(),
            r#"WORD("ls") REDIR_APP WORD("x") EOF"#
        );
        assert_eq!(Token::Pipe.value(), None);
        assert_eq!(word("a").value(), Some("a"));
    }
}
