//! Scan → parse → resolve → interpret, with one interpreter kept alive
//! across calls so REPL lines see each other's definitions.

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session printing to stdout.
    pub fn new() -> Self {
        Session {
            interpreter: Interpreter::new(),
        }
    }

    /// Session handing each printed line to `sink`.
    pub fn with_output<F>(sink: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        Session {
            interpreter: Interpreter::with_output(sink),
        }
    }

    /// Run a program or REPL line.  Static errors are all reported and nothing
    /// runs; a runtime error stops the unit and comes back alone.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        let (tokens, mut errors) = scan_tokens(source);

        let (statements, parse_errors) = Parser::new(&tokens).parse();
        errors.extend(parse_errors);

        if !errors.is_empty() {
            debug!("{} static error(s) before resolution", errors.len());
            return Err(errors);
        }

        let resolver = Resolver::with_globals(self.interpreter.global_names());
        let (bindings, resolve_errors) = resolver.resolve(&statements);

        if !resolve_errors.is_empty() {
            return Err(resolve_errors);
        }

        self.interpreter.add_bindings(bindings);

        info!("Running {} statement(s)", statements.len());

        self.interpreter.interpret(&statements).map_err(|e| vec![e])
    }

    /// Evaluate `source` as one expression and print its value.
    pub fn evaluate(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        let (tokens, mut errors) = scan_tokens(source);

        let (expr, parse_errors) = Parser::new(&tokens).parse_expression();
        errors.extend(parse_errors);

        let expr = match expr {
            Some(expr) if errors.is_empty() => expr,
            _ => return Err(errors),
        };

        let resolver = Resolver::with_globals(self.interpreter.global_names());
        let (bindings, resolve_errors) = resolver.resolve_expression(&expr);

        if !resolve_errors.is_empty() {
            return Err(resolve_errors);
        }

        self.interpreter.add_bindings(bindings);
        self.interpreter.interpret_single(&expr).map_err(|e| vec![e])
    }
}
