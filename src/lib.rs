//! A tree-walking interpreter for the Lox language.
//!
//! The pipeline runs scanner, parser, resolver and interpreter in order,
//! gated on the [`session::Session`] error flags so a later phase only
//! runs when the earlier phases left no diagnostics.

use std::time::{Duration, Instant};

use log::debug;

pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod natives;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod stmt;
pub mod token;
pub mod value;

use ast_printer::AstPrinter;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;
use session::Session;
use token::Token;

/// Wall-clock time spent per pipeline phase.  Phases skipped because an
/// earlier one reported errors stay at zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseTimings {
    pub scan: Duration,
    pub parse: Duration,
    pub resolve: Duration,
    pub interpret: Duration,
}

/// Run one source unit (a file, or a REPL line) against `interpreter`.
/// Diagnostics land in `session`; the caller picks the exit code.
pub fn run(source: &str, interpreter: &mut Interpreter, session: &Session) -> PhaseTimings {
    let mut timings = PhaseTimings::default();

    let started = Instant::now();
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(err) => session.report(&err),
        }
    }

    timings.scan = started.elapsed();

    if session.had_error() {
        return timings;
    }

    let started = Instant::now();
    let statements = Parser::new(tokens, session).parse();
    timings.parse = started.elapsed();

    if session.had_error() {
        return timings;
    }

    if log::log_enabled!(log::Level::Debug) {
        for stmt in &statements {
            debug!("ast: {}", AstPrinter::print_stmt(stmt));
        }
    }

    let started = Instant::now();
    Resolver::new(interpreter, session).resolve(&statements);
    timings.resolve = started.elapsed();

    if session.had_error() {
        return timings;
    }

    let started = Instant::now();
    interpreter.interpret(&statements, session);
    timings.interpret = started.elapsed();

    timings
}
