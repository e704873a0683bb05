//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. maintains a stack of lexical scopes (`name -> defined?`), telling a
//!    *declared* binding (`false`) apart from a *defined* one (`true`);
//! 2. enforces the static rules around shadowing, `return`, `this` and
//!    `super`, reporting violations through the [`Session`] and carrying
//!    on so one run surfaces them all;
//! 3. records the binding depth of every local `Variable` / `Assign` /
//!    `This` / `Super` occurrence into the interpreter's side table, so
//!    the runtime climbs exactly the right number of environment frames.
//!
//! Names not found in any scope are globals and get no table entry.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::LoxError;
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::session::Session;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'i, 's> {
    interpreter: &'i mut Interpreter,
    session: &'s Session,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'i, 's> Resolver<'i, 's> {
    pub fn new(interpreter: &'i mut Interpreter, session: &'s Session) -> Self {
        Resolver {
            interpreter,
            session,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ───────────────────────── statements ─────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);

                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }

                self.define(name);
            }

            Stmt::Function(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        let enclosing_class: ClassType = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            self.current_class = ClassType::Subclass;

            if let Expr::Variable {
                name: superclass_name,
                ..
            } = superclass
            {
                if superclass_name.lexeme == name.lexeme {
                    self.error(superclass_name, "A class can't inherit from itself.");
                }
            }

            self.resolve_expr(superclass);

            // Methods of a subclass close over an extra scope binding
            // `super`, outside the `this` scope.
            self.begin_scope();
            self.scope_insert("super", true);
        }

        self.begin_scope();
        self.scope_insert("this", true);

        for method in methods {
            let declaration: FunctionType = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = function_type;

        self.begin_scope();

        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }

        self.resolve(&declaration.body);

        self.end_scope();

        self.current_function = enclosing;
    }

    // ───────────────────────── expressions ─────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { name, id } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { name, value, id } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { keyword, id } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { keyword, id, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }

                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ───────────────────────── scope bookkeeping ─────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_insert(&mut self, name: &str, defined: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), defined);
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            let err = LoxError::resolve(name, "Already a variable with this name in this scope.");
            self.session.report(&err);
        }

        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        self.scope_insert(&name.lexeme, true);
    }

    /// Search the scope stack innermost-out; the first hit records
    /// `depth = hops from the innermost scope`.  No hit means global.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("'{}' bound at depth {}", name.lexeme, depth);

                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("'{}' is global", name.lexeme);
    }

    fn error(&self, token: &Token, message: &str) {
        let err = LoxError::resolve(token, message);
        self.session.report(&err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve_source(source: &str) -> bool {
        let session = Session::new();
        let tokens: Vec<Token> = Scanner::new(source).filter_map(|r| r.ok()).collect();
        let statements = Parser::new(tokens, &session).parse();
        assert!(!session.had_error(), "parse failed for {:?}", source);

        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter, &session).resolve(&statements);
        session.had_error()
    }

    #[test]
    fn top_level_return_is_an_error() {
        assert!(resolve_source("return 1;"));
    }

    #[test]
    fn return_inside_function_is_fine() {
        assert!(!resolve_source("fun f() { return 1; }"));
    }

    #[test]
    fn redeclaration_in_same_scope_is_an_error() {
        assert!(resolve_source("fun f() { var x = 1; var x = 2; }"));
    }

    #[test]
    fn redeclaration_at_global_scope_is_allowed() {
        assert!(!resolve_source("var x = 1; var x = 2;"));
    }

    #[test]
    fn reading_a_local_in_its_own_initializer_is_an_error() {
        assert!(resolve_source("{ var a = 1; { var a = a; } }"));
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        assert!(resolve_source("print this;"));
    }

    #[test]
    fn super_without_a_superclass_is_an_error() {
        assert!(resolve_source("class A { m() { super.m(); } }"));
    }

    #[test]
    fn super_outside_a_class_is_an_error() {
        assert!(resolve_source("fun f() { super.m(); }"));
    }

    #[test]
    fn class_cannot_inherit_from_itself() {
        assert!(resolve_source("class A < A {}"));
    }

    #[test]
    fn initializer_cannot_return_a_value() {
        assert!(resolve_source("class A { init() { return 1; } }"));
        assert!(!resolve_source("class A { init() { return; } }"));
    }
}
