use std::cell::RefCell;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;

use clap::Parser;
use interpreter::Lox;
use tracing_subscriber::{fmt, EnvFilter};

/// Losk - a tree-walk interpreter for the Lox language
#[derive(Parser, Debug)]
#[command(name = "losk")]
#[command(about = "Run a Lox script, or start a prompt when no script is given", long_about = None)]
struct Args {
    /// Print every parsed program in prefix form before running it
    #[arg(long)]
    debug_parse: bool,

    /// Script to run
    script: Option<PathBuf>,
}

// Native stack for the thread running the session, enough for the interpreter's call depth limit
const STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() -> ExitCode {
    // RUST_LOG controls the log level, warn if not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if let Err(io_err) = err.print() {
                tracing::error!("failed to write usage: {}", io_err);
            }
            return if err.use_stderr() {
                ExitCode::from(64)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let runner = thread::Builder::new()
        .name(String::from("losk"))
        .stack_size(STACK_SIZE)
        .spawn(move || run(args));

    match runner.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("failed to start interpreter thread: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> ExitCode {
    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let stderr: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stderr()));
    let mut lox = Lox::new(stdout, stderr);
    lox.set_debug_parse(args.debug_parse);

    match args.script {
        Some(path) => run_file(&mut lox, &path),
        None => match run_prompt(&mut lox) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{}", err);
                ExitCode::from(74)
            }
        },
    }
}

fn run_file(lox: &mut Lox, path: &Path) -> ExitCode {
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("Could not read '{}': {}", path.display(), err);
            return ExitCode::from(74);
        }
    };

    tracing::debug!(path = %path.display(), bytes = src.len(), "running script");
    match lox.run(&src).exit_code() {
        Some(code) => ExitCode::from(code as u8),
        None => ExitCode::SUCCESS,
    }
}

// Errors are reported and the prompt carries on, the session keeps every global defined so far
fn run_prompt(lox: &mut Lox) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }

        lox.run(&line);
    }
}
