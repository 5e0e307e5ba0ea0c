use anyhow::{Context, Result};
use shelli::config::Options;
use shelli::{Executor, Interpreter, StepLogger};
use std::process::ExitCode;
use std::sync::atomic::Ordering;

fn main() -> Result<ExitCode> {
    let options: Options = argh::from_env();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(options.log_filter()))
        .init();
    log::debug!("options: {options:?}");

    let executor = Executor::default().with_logger(StepLogger);
    let mut shell = Interpreter::new(executor, options.limits());

    // Children in the foreground receive Ctrl-C from the terminal themselves;
    // the shell only records it and keeps running.
    let interrupted = shell.interrupt_flag();
    ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
        .context("failed to install the Ctrl-C handler")?;

    let status = match &options.command {
        Some(line) => match shell.eval_line(line) {
            Ok(status) => status,
            Err(e) => {
                eprintln!("shelli: {e}");
                2
            }
        },
        None => shell.repl().context("line editor failed")?,
    };

    Ok(ExitCode::from((status & 0xff) as u8))
}
