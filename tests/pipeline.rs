#![cfg(unix)]

use shelli::env::Environment;
use shelli::lexer::tokenize;
use shelli::parser::parse;
use shelli::{CaptureBuffer, Executor, Pipeline, RedirectKind, Token};
use std::fs;

fn parse_line(line: &str) -> Pipeline {
    parse(tokenize(line).expect("lex")).expect("parse").expect("pipeline")
}

#[test]
fn lex_parse_execute_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let line = format!("printf 'one\\ntwo\\n' | wc -l > {}", out.display());

    let tokens = tokenize(&line).unwrap();
    assert_eq!(tokens.as_slice()[2], Token::Pipe);
    assert_eq!(tokens.as_slice().last(), Some(&Token::EndOfInput));

    let pipeline = parse(tokens).unwrap().unwrap();
    assert_eq!(pipeline.len(), 2);
    let redirect = pipeline.commands()[1].redirect_out.as_ref().unwrap();
    assert_eq!(redirect.kind, RedirectKind::Output);

    let status = Executor::default().run(&pipeline, &mut Environment::empty());
    assert_eq!(status, 0);
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "2");
}

#[test]
fn long_pipelines_see_end_of_file() {
    let line = "printf 'c\\nb\\na\\n' | sort | cat | cat | cat | head -n 1";
    let mut buffer = CaptureBuffer::with_capacity(64);
    let status =
        Executor::default().run_capture(&parse_line(line), &mut Environment::empty(), &mut buffer);
    assert_eq!(status, 0);
    assert_eq!(buffer.text(), "a");
}

#[test]
fn quoted_arguments_reach_the_program_intact() {
    let mut buffer = CaptureBuffer::with_capacity(64);
    let status = Executor::default().run_capture(
        &parse_line(r#"printf '[%s]' "a b" 'c|d' x'y z'"#),
        &mut Environment::empty(),
        &mut buffer,
    );
    assert_eq!(status, 0);
    assert_eq!(buffer.text(), "[a b][c|d][xy z]");
}

#[test]
fn append_accumulates_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");
    let executor = Executor::default();
    let mut env = Environment::empty();
    for word in ["a", "b", "c"] {
        let line = format!("printf {word} >> {}", log.display());
        assert_eq!(executor.run(&parse_line(&line), &mut env), 0);
    }
    assert_eq!(fs::read_to_string(&log).unwrap(), "abc");
}
