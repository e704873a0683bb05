use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::session::Session;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Recursive-descent parser over the scanned token stream.
///
/// Recoverable syntax errors are reported through the [`Session`] and the
/// parser re-synchronizes at the next statement boundary, so a single run
/// surfaces every error it can find.  The returned statement list contains
/// only the declarations that parsed cleanly; the session's error flag
/// tells the driver whether it is safe to execute them.
pub struct Parser<'s> {
    tokens: Vec<Token>,
    current: usize,
    session: &'s Session,
}

impl<'s> Parser<'s> {
    pub fn new(tokens: Vec<Token>, session: &'s Session) -> Self {
        Parser {
            tokens,
            current: 0,
            session,
        }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(err) => {
                    self.session.report(&err);
                    self.synchronize();
                }
            }
        }

        debug!("parsed {} top-level statement(s)", statements.len());

        statements
    }

    // ───────────────────────── declarations ─────────────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::CLASS]) {
            return self.class_declaration();
        }

        if self.match_tokens(&[TokenType::FUN]) {
            return Ok(Stmt::Function(self.function("function")?));
        }

        if self.match_tokens(&[TokenType::VAR]) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass: Option<Expr> = if self.match_tokens(&[TokenType::LESS]) {
            self.consume(&TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::Variable {
                name: self.previous().clone(),
                id: ExprId::fresh(),
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token =
            self.consume(&TokenType::IDENTIFIER, format!("Expect {} name.", kind))?;

        self.consume(
            &TokenType::LEFT_PAREN,
            format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let err = LoxError::parse(self.peek(), "Can't have more than 255 parameters.");
                    self.session.report(&err);
                }

                params.push(self.consume(&TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            &TokenType::LEFT_BRACE,
            format!("Expect '{{' before {} body.", kind),
        )?;

        let body: Vec<Stmt> = self.block_statements()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr> = if self.match_tokens(&[TokenType::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statements ─────────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::FOR]) {
            return self.for_statement();
        }

        if self.match_tokens(&[TokenType::IF]) {
            return self.if_statement();
        }

        if self.match_tokens(&[TokenType::PRINT]) {
            return self.print_statement();
        }

        if self.match_tokens(&[TokenType::RETURN]) {
            return self.return_statement();
        }

        if self.match_tokens(&[TokenType::WHILE]) {
            return self.while_statement();
        }

        if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block_statements()?));
        }

        self.expression_statement()
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_tokens(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_tokens(&[TokenType::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body: Stmt = self.statement()?;

        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        body = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::True)),
            body: Box::new(body),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);

        let else_branch: Option<Box<Stmt>> = if self.match_tokens(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn block_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(err) => {
                    self.session.report(&err);
                    self.synchronize();
                }
            }
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    // ───────────────────────── expressions ─────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.or()?;

        if self.match_tokens(&[TokenType::EQUAL]) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(Expr::Assign {
                        name,
                        value: Box::new(value),
                        id: ExprId::fresh(),
                    });
                }

                Expr::Get { object, name } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                    });
                }

                _ => {
                    // Reported but not synchronized: the parse can continue
                    // from here.
                    let err = LoxError::parse(&equals, "Invalid assignment target.");
                    self.session.report(&err);
                }
            }
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.and()?;

        while self.match_tokens(&[TokenType::OR]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.match_tokens(&[TokenType::AND]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.match_tokens(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let name: Token =
                    self.consume(&TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let err = LoxError::parse(self.peek(), "Can't have more than 255 arguments.");
                    self.session.report(&err);
                }

                arguments.push(self.expression()?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::FALSE]) {
            return Ok(Expr::Literal(LiteralValue::False));
        }

        if self.match_tokens(&[TokenType::TRUE]) {
            return Ok(Expr::Literal(LiteralValue::True));
        }

        if self.match_tokens(&[TokenType::NIL]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.match_tokens(&[TokenType::NUMBER(0.0), TokenType::STRING(String::new())]) {
            let literal: LiteralValue = match &self.previous().token_type {
                TokenType::NUMBER(n) => LiteralValue::Number(*n),
                TokenType::STRING(s) => LiteralValue::Str(s.clone()),
                _ => unreachable!("literal token just matched"),
            };

            return Ok(Expr::Literal(literal));
        }

        if self.match_tokens(&[TokenType::SUPER]) {
            let keyword: Token = self.previous().clone();
            self.consume(&TokenType::DOT, "Expect '.' after 'super'.")?;
            let method: Token =
                self.consume(&TokenType::IDENTIFIER, "Expect superclass method name.")?;

            return Ok(Expr::Super {
                keyword,
                method,
                id: ExprId::fresh(),
            });
        }

        if self.match_tokens(&[TokenType::THIS]) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
                id: ExprId::fresh(),
            });
        }

        if self.match_tokens(&[TokenType::IDENTIFIER]) {
            return Ok(Expr::Variable {
                name: self.previous().clone(),
                id: ExprId::fresh(),
            });
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr: Expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse(self.peek(), "Expect expression."))
    }

    // ───────────────────────── helpers ─────────────────────────

    /// Panic-mode recovery: skip to just past the next ';' or to the next
    /// statement-introducing keyword.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,

                _ => {}
            }

            self.advance();
        }
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn consume<S: Into<String>>(&mut self, token_type: &TokenType, msg: S) -> Result<Token> {
        if self.check(token_type) {
            return Ok(self.advance().clone());
        }

        Err(LoxError::parse(self.peek(), msg))
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        &self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse_source(source: &str) -> (Vec<Stmt>, bool) {
        let session = Session::new();
        let tokens: Vec<Token> = Scanner::new(source).filter_map(|r| r.ok()).collect();
        let statements = Parser::new(tokens, &session).parse();
        let had_error = session.had_error();
        (statements, had_error)
    }

    #[test]
    fn parses_var_declaration() {
        let (stmts, had_error) = parse_source("var answer = 42;");

        assert!(!had_error);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(
            &stmts[0],
            Stmt::Var {
                name,
                initializer: Some(_)
            } if name.lexeme == "answer"
        ));
    }

    #[test]
    fn for_loop_desugars_to_while_in_blocks() {
        let (stmts, had_error) = parse_source("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(!had_error);
        assert_eq!(stmts.len(), 1);

        let Stmt::Block(outer) = &stmts[0] else {
            panic!("expected outer block, got {:?}", stmts[0]);
        };

        assert!(matches!(outer[0], Stmt::Var { .. }));
        assert!(matches!(outer[1], Stmt::While { .. }));
    }

    #[test]
    fn for_loop_without_clauses() {
        let (stmts, had_error) = parse_source("for (;;) print 1;");

        assert!(!had_error);
        let Stmt::While { condition, .. } = &stmts[0] else {
            panic!("expected bare while, got {:?}", stmts[0]);
        };
        assert!(matches!(condition, Expr::Literal(LiteralValue::True)));
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_parsing_continues() {
        let (stmts, had_error) = parse_source("1 = 2; print 3;");

        assert!(had_error);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn synchronizes_after_error_and_keeps_later_statements() {
        let (stmts, had_error) = parse_source("var = 1;\nprint 2;");

        assert!(had_error);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Print(_)));
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let (stmts, had_error) = parse_source("class B < A { init() {} greet() {} }");

        assert!(!had_error);
        let Stmt::Class {
            name,
            superclass,
            methods,
        } = &stmts[0]
        else {
            panic!("expected class, got {:?}", stmts[0]);
        };

        assert_eq!(name.lexeme, "B");
        assert!(superclass.is_some());
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn at_most_255_arguments() {
        let ok: String = format!("f({});", vec!["1"; 255].join(", "));
        let (_, had_error) = parse_source(&ok);
        assert!(!had_error);

        let too_many: String = format!("f({});", vec!["1"; 256].join(", "));
        let (_, had_error) = parse_source(&too_many);
        assert!(had_error);
    }

    #[test]
    fn at_most_255_parameters() {
        let params_255: String = (0..255).map(|i| format!("p{}", i)).collect::<Vec<_>>().join(", ");
        let (_, had_error) = parse_source(&format!("fun f({}) {{}}", params_255));
        assert!(!had_error);

        let params_256: String = (0..256).map(|i| format!("p{}", i)).collect::<Vec<_>>().join(", ");
        let (_, had_error) = parse_source(&format!("fun f({}) {{}}", params_256));
        assert!(had_error);
    }

    #[test]
    fn super_requires_dot_and_method_name() {
        let (_, had_error) = parse_source("class B < A { m() { return super.m; } }");
        assert!(!had_error);

        let (_, had_error) = parse_source("class B < A { m() { return super; } }");
        assert!(had_error);
    }
}
