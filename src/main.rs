use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use lox::{is_incomplete, ErrorKind, Interpreter, InterpreterConfig, LoxError, DEFAULT_MAX_CALL_DEPTH};
use rustyline::{error::ReadlineError, DefaultEditor};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// sysexits.h
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

#[derive(Parser)]
#[command(name = "lox", version, about = "Tree-walking interpreter for a small scripting language")]
struct Cli {
    /// Script to run. Starts an interactive session when omitted
    file: Option<PathBuf>,

    /// Maximum depth of nested function calls
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,
}

/// Logs go to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn exit_code(error: &LoxError) -> ExitCode {
    ExitCode::from(match error.kind() {
        ErrorKind::Syntax => EX_DATAERR,
        _ => EX_SOFTWARE,
    })
}

fn run_file(path: PathBuf, config: InterpreterConfig) -> ExitCode {
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error: cannot read {}: {}", path.display(), error);
            return ExitCode::from(EX_IOERR);
        }
    };

    let mut interpreter = Interpreter::new().with_config(config);
    match interpreter.run(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            exit_code(&error)
        }
    }
}

fn repl(config: InterpreterConfig) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("starting the line editor")?;
    let mut interpreter = Interpreter::new().with_config(config);

    // Lines accumulate here until braces and parentheses balance
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ". " };
        match editor.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && matches!(line.trim(), ":quit" | ":q") {
                    break;
                }

                buffer.push_str(&line);
                buffer.push('\n');
                if is_incomplete(&buffer) {
                    continue;
                }

                if !buffer.trim().is_empty() {
                    let _ = editor.add_history_entry(buffer.trim_end());
                    match interpreter.evaluate_str(&buffer) {
                        Ok(Some(value)) => println!("{}", value),
                        Ok(None) => {}
                        Err(error) => eprintln!("Error: {}", error),
                    }
                }
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => buffer.clear(),
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(error.into()),
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = InterpreterConfig::default().with_max_call_depth(cli.max_depth);

    match cli.file {
        Some(path) => Ok(run_file(path, config)),
        None => {
            repl(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
