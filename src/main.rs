use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::{scan_tokens, Scanner};
use rox::session::Session;

/// Exit status for scan/parse/resolve failures.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit status for runtime failures.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array instead of one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints each statement's AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs a Lox program from a file; starts the REPL without one
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(errors: &[LoxError]) {
    for e in errors {
        debug!("Reporting error at line {:?}: {:?}", e.line(), e);
        eprintln!("{}", e);
    }
}

/// 70 if the unit died at run time, 65 for anything caught statically.
fn exit_code(errors: &[LoxError]) -> i32 {
    if errors.iter().any(LoxError::is_runtime) {
        EXIT_RUNTIME_ERROR
    } else {
        EXIT_STATIC_ERROR
    }
}

fn no_input() -> ! {
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    if json {
        let (tokens, errors) = scan_tokens(source);
        tokenized = errors.is_empty();
        report(&errors);

        let out = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", out);
    } else {
        for token in Scanner::new(source) {
            match token {
                Ok(token) => println!("{}", token),

                Err(e) => {
                    tokenized = false;
                    eprintln!("{}", e);
                }
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) {
    let (tokens, mut errors) = scan_tokens(source);
    let (statements, parse_errors) = Parser::new(&tokens).parse();
    errors.extend(parse_errors);

    if !errors.is_empty() {
        report(&errors);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    for stmt in &statements {
        let ast_str = AstPrinter::print_stmt(stmt);
        debug!("AST: {}", ast_str);
        println!("{}", ast_str);
    }
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut session = Session::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        if let Err(errors) = session.run(&line) {
            report(&errors);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Tokenize subcommand");

            tokenize(&read_file(filename)?, json)?;
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Parse subcommand");

            parse(&read_file(filename)?);
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else { no_input() };
            info!("Running Evaluate subcommand");

            let source = read_file(filename)?;
            let mut session = Session::new();

            if let Err(errors) = session.evaluate(&source) {
                report(&errors);
                std::process::exit(exit_code(&errors));
            }
        }

        Commands::Run { filename: None } | Commands::Repl => repl()?,

        Commands::Run {
            filename: Some(filename),
        } => {
            info!("Running Run subcommand");

            let source = read_file(filename)?;
            let mut session = Session::new();

            if let Err(errors) = session.run(&source) {
                report(&errors);
                std::process::exit(exit_code(&errors));
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
