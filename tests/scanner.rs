use rox::error::LoxError;
use rox::scanner::Scanner;
use rox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source);
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(
        tokens.len(),
        expected.len(),
        "token count mismatch for {:?}: {:?}",
        source,
        tokens
    );

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn scans_punctuation() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_one_and_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >= / //comment",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::SLASH, "/"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_upgrade_identifiers() {
    assert_token_sequence(
        "var language = nil; classy orchid",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "language"),
            (TokenType::EQUAL, "="),
            (TokenType::NIL, "nil"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::IDENTIFIER, "classy"),
            (TokenType::IDENTIFIER, "orchid"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_literals_parse_as_doubles() {
    let tokens: Vec<Token> = Scanner::new("123 45.67").filter_map(Result::ok).collect();

    let TokenType::NUMBER(a) = tokens[0].token_type else {
        panic!("expected number, got {:?}", tokens[0]);
    };
    let TokenType::NUMBER(b) = tokens[1].token_type else {
        panic!("expected number, got {:?}", tokens[1]);
    };

    assert_eq!(a, 123.0);
    assert_eq!(b, 45.67);
}

#[test]
fn trailing_dot_is_left_for_property_access() {
    assert_token_sequence(
        "123.sqrt",
        &[
            (TokenType::NUMBER(123.0), "123"),
            (TokenType::DOT, "."),
            (TokenType::IDENTIFIER, "sqrt"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn string_literal_excludes_quotes_and_tracks_newlines() {
    let tokens: Vec<Token> = Scanner::new("\"first\nsecond\" after")
        .filter_map(Result::ok)
        .collect();

    let TokenType::STRING(ref literal) = tokens[0].token_type else {
        panic!("expected string, got {:?}", tokens[0]);
    };

    assert_eq!(literal, "first\nsecond");
    assert_eq!(tokens[0].lexeme, "\"first\nsecond\"");

    // The embedded newline bumped the line counter.
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn string_literals_may_contain_unicode() {
    let tokens: Vec<Token> = Scanner::new("\"héllo, wörld\"")
        .filter_map(Result::ok)
        .collect();

    let TokenType::STRING(ref literal) = tokens[0].token_type else {
        panic!("expected string, got {:?}", tokens[0]);
    };

    assert_eq!(literal, "héllo, wörld");
}

#[test]
fn unterminated_string_is_an_error() {
    let results: Vec<_> = Scanner::new("\"oops").collect();

    let errs: Vec<&LoxError> = results.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].to_string(), "[line 1] Error: Unterminated string.");
}

#[test]
fn scanning_continues_past_unexpected_characters() {
    let results: Vec<_> = Scanner::new(",.$(#").collect();

    let tokens: Vec<&Token> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let errors: usize = results.iter().filter(|r| r.is_err()).count();

    assert_eq!(errors, 2);

    let kinds: Vec<&TokenType> = tokens.iter().map(|t| &t.token_type).collect();
    assert_eq!(
        kinds,
        vec![
            &TokenType::COMMA,
            &TokenType::DOT,
            &TokenType::LEFT_PAREN,
            &TokenType::EOF,
        ]
    );

    for result in &results {
        if let Err(err) = result {
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }
}

#[test]
fn comments_and_whitespace_produce_no_tokens() {
    assert_token_sequence(
        "// just a comment\n\t \r\n// another with UTF-8 ©\n",
        &[(TokenType::EOF, "")],
    );
}

#[test]
fn line_numbers_advance_per_newline() {
    let tokens: Vec<Token> = Scanner::new("one\ntwo\n\nthree")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
    assert_eq!(tokens[2].line, 4);
}
