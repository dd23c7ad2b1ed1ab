//! Minimal line-oriented front-end for the `lisk` interpreter.
//!
//! One expression per line against a single persistent session. With a file
//! argument, evaluates every non-empty line and stops at the first error;
//! without one, reads lines from stdin until EOF.

use std::{
    env, fs,
    io::{self, BufRead, Write},
    process::ExitCode,
};

use lisk::Interpreter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.get(1) {
        Some(path) => run_file(path),
        None => run_repl(),
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut interp = Interpreter::new();
    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match interp.run(line) {
            Ok(printed) => println!("{printed}"),
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_repl() -> ExitCode {
    let mut interp = Interpreter::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        if stdout.flush().is_err() {
            return ExitCode::FAILURE;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        match interp.run(&line) {
            Ok(printed) => println!("{printed}"),
            Err(err) => eprintln!("{err}"),
        }
    }
}
