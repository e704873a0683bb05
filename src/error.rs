//! Centralised error hierarchy for the interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This
//! enables a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow` at the binary boundary, while still
//! preserving rich diagnostic detail.
//!
//! The module does not print diagnostics itself; the [`crate::session`]
//! collector owns reporting.

use std::io;

use thiserror::Error;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error, located at a token.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static-analysis failure (early-binding and scope rules).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.  Rendered the way the book's tree-walker
    /// prints its one-frame stack trace.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`.  Enables `?` on I/O ops.
    #[error("{0}")]
    Io(String),
}

impl From<io::Error> for LoxError {
    fn from(err: io::Error) -> Self {
        LoxError::Io(err.to_string())
    }
}

/// `" at end"` for EOF, `" at '<lexeme>'"` otherwise.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        LoxError::Lex {
            message: msg.into(),
            line,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        LoxError::Parse {
            message: msg.into(),
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        LoxError::Resolve {
            message: msg.into(),
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        LoxError::Runtime {
            message: msg.into(),
            line: token.line,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(lexeme: &str, line: usize) -> Token {
        Token::new(TokenType::IDENTIFIER, lexeme.to_string(), line)
    }

    #[test]
    fn lex_errors_have_no_location() {
        let err = LoxError::lex(3, "Unexpected character.");

        assert_eq!(err.to_string(), "[line 3] Error: Unexpected character.");
    }

    #[test]
    fn parse_errors_point_at_the_lexeme() {
        let err = LoxError::parse(&ident("x", 1), "Expect ';' after value.");

        assert_eq!(
            err.to_string(),
            "[line 1] Error at 'x': Expect ';' after value."
        );
    }

    #[test]
    fn parse_errors_at_eof_say_at_end() {
        let eof = Token::new(TokenType::EOF, String::new(), 7);
        let err = LoxError::parse(&eof, "Expect expression.");

        assert_eq!(err.to_string(), "[line 7] Error at end: Expect expression.");
    }

    #[test]
    fn runtime_errors_render_message_then_line() {
        let plus = Token::new(TokenType::PLUS, "+".to_string(), 1);
        let err = LoxError::runtime(&plus, "Operands must be two numbers or two strings.");

        assert_eq!(
            err.to_string(),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
    }
}
