use clap::{App, Arg, ErrorKind};
use loxwalk::interpreter::Interpreter;
use loxwalk::printer::AstPrinter;
use loxwalk::value::Value;
use loxwalk::{scanner, LoxError};
use std::fs;
use std::io::{self, BufRead, Write};
use std::thread;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_USAGE: i32 = 64;
const EXIT_DATAERR: i32 = 65;
const EXIT_SOFTWARE: i32 = 70;
const EXIT_IOERR: i32 = 74;

#[derive(Clone, Copy, Debug)]
enum Mode {
    Interpret,
    PrintAst,
    Tokens,
}

fn main() {
    init_tracing();
    let app = App::new("loxwalk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tree-walking interpreter for the Lox scripting language")
        .arg(
            Arg::with_name("SCRIPT")
                .help("Script to run. Starts a REPL when omitted.")
                .index(1),
        )
        .arg(
            Arg::with_name("print-ast")
                .long("print-ast")
                .help("Print the parsed program instead of running it"),
        )
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .conflicts_with("print-ast")
                .help("Print the token stream instead of running it"),
        );
    let matches = match app.get_matches_safe() {
        Ok(m) => m,
        Err(e) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                eprintln!("{}", e.message);
                std::process::exit(EXIT_USAGE);
            }
        },
    };
    let mode = if matches.is_present("print-ast") {
        Mode::PrintAst
    } else if matches.is_present("tokens") {
        Mode::Tokens
    } else {
        Mode::Interpret
    };
    let script = matches.value_of("SCRIPT").map(String::from);
    let worker = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(loxwalk::INTERPRETER_STACK_SIZE)
        .spawn(move || match script {
            Some(path) => run_file(&path, mode),
            None => run_prompt(mode),
        });
    let code = match worker {
        Ok(handle) => handle.join().unwrap_or(EXIT_SOFTWARE),
        Err(e) => {
            eprintln!("error: could not start interpreter thread: {}", e);
            EXIT_SOFTWARE
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &str, mode: Mode) -> i32 {
    debug!(path, ?mode, "running file");
    let contents = match fs::read_to_string(path) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", path, e);
            return EXIT_IOERR;
        }
    };
    let mut interpreter = Interpreter::new();
    match run(&contents, mode, &mut interpreter) {
        Ok(()) => 0,
        Err(errors) => {
            report(&errors);
            if errors.iter().any(LoxError::is_runtime) {
                EXIT_SOFTWARE
            } else {
                EXIT_DATAERR
            }
        }
    }
}

fn run_prompt(mode: Mode) -> i32 {
    debug!(?mode, "starting prompt");
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("error: {}", e);
            return EXIT_IOERR;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                return 0;
            }
            Ok(_) => {
                // A failed line is discarded; the session keeps its globals.
                if let Err(errors) = run(&line, mode, &mut interpreter) {
                    report(&errors);
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                return EXIT_IOERR;
            }
        }
    }
}

fn run(source: &str, mode: Mode, interpreter: &mut Interpreter) -> Result<(), Vec<LoxError>> {
    match mode {
        Mode::Tokens => {
            let (tokens, errors) = scanner::scan_tokens(source);
            for token in &tokens {
                println!("{}", token);
            }
            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors.into_iter().map(LoxError::from).collect())
            }
        }
        Mode::PrintAst => {
            let (statements, errors) = loxwalk::parse_source(source);
            println!("{}", AstPrinter::new().print_program(&statements));
            if errors.is_empty() {
                Ok(())
            } else {
                Err(errors)
            }
        }
        Mode::Interpret => match loxwalk::run(source, interpreter)? {
            Some(Value::Nil) | None => Ok(()),
            Some(x) => {
                println!("{}", x);
                Ok(())
            }
        },
    }
}

fn report(errors: &[LoxError]) {
    for e in errors {
        eprintln!("{}", e);
    }
}
