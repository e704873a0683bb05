use std::iter::FusedIterator;

use log::debug;
use phf::phf_map;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

/// Lexer over the raw source bytes.  Implements `Iterator`, yielding one
/// `Result<Token, LoxError>` per lexeme and a final `EOF` token; lex
/// errors are yielded in-stream so the caller can report them and keep
/// scanning.
///
/// Identifiers are ASCII; string literals and comments may carry
/// arbitrary UTF-8 (multi-byte sequences only ever appear inside them, so
/// byte-wise scanning never splits a code point elsewhere).
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a [u8],
    start: usize,
    current: usize,
    line: usize,
    pending_token: Option<TokenType>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        debug!("initializing scanner with {} bytes", source.len());

        Self {
            source: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            pending_token: None,
        }
    }

    fn scan_token(&mut self) -> Result<(), LoxError> {
        let byte: u8 = self.advance();

        match byte {
            b'(' => self.add_token(TokenType::LEFT_PAREN),

            b')' => self.add_token(TokenType::RIGHT_PAREN),

            b'{' => self.add_token(TokenType::LEFT_BRACE),

            b'}' => self.add_token(TokenType::RIGHT_BRACE),

            b',' => self.add_token(TokenType::COMMA),

            b'.' => self.add_token(TokenType::DOT),

            b'-' => self.add_token(TokenType::MINUS),

            b'+' => self.add_token(TokenType::PLUS),

            b';' => self.add_token(TokenType::SEMICOLON),

            b'*' => self.add_token(TokenType::STAR),

            b'!' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };
                self.add_token(token_type);
            }

            b'=' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };
                self.add_token(token_type);
            }

            b'<' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };
                self.add_token(token_type);
            }

            b'>' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };
                self.add_token(token_type);
            }

            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1;
            }

            b'/' => {
                if self.match_byte(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            b'"' => {
                self.scan_string()?;
            }

            b'0'..=b'9' => {
                self.scan_number()?;
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.scan_identifier();
            }

            _ => {
                return Err(LoxError::lex(self.line, "Unexpected character."));
            }
        }

        Ok(())
    }

    fn scan_string(&mut self) -> Result<(), LoxError> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        // The closing quote.
        self.advance();

        let literal: String = self.lexeme_str(self.start + 1, self.current - 1).to_string();

        debug!("scanned string literal: {:?}", literal);

        self.add_token(TokenType::STRING(literal));

        Ok(())
    }

    fn scan_number(&mut self) -> Result<(), LoxError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A fractional part only if the '.' is followed by a digit; a bare
        // trailing '.' is left for the parser (property access).
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: &str = self.lexeme_str(self.start, self.current);

        let number: f64 = text
            .parse()
            .map_err(|_| LoxError::lex(self.line, format!("Invalid number '{}'.", text)))?;

        self.add_token(TokenType::NUMBER(number));

        Ok(())
    }

    fn scan_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.source[self.start..self.current];

        match KEYWORDS.get(text) {
            Some(token_type) => self.add_token(token_type.clone()),

            None => self.add_token(TokenType::IDENTIFIER),
        }
    }

    // The scanner only ever slices at lexeme boundaries, which are ASCII.
    fn lexeme_str(&self, start: usize, end: usize) -> &'a str {
        let source: &'a [u8] = self.source;
        std::str::from_utf8(&source[start..end]).unwrap_or_default()
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.current];
        self.current += 1;
        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, LoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_at_end() {
            if self.current == self.source.len() {
                self.current += 1;

                return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
            }

            return None;
        }

        self.pending_token = None;
        self.start = self.current;

        if let Err(e) = self.scan_token() {
            return Some(Err(e));
        }

        if let Some(token_type) = self.pending_token.take() {
            let lexeme: &str = self.lexeme_str(self.start, self.current);

            debug!(
                "token: type={:?}, lexeme={:?}, line={}",
                token_type, lexeme, self.line
            );

            Some(Ok(Token::new(token_type, lexeme.to_string(), self.line)))
        } else {
            // Whitespace or a comment; keep going.
            self.next()
        }
    }
}

impl FusedIterator for Scanner<'_> {}
