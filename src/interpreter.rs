use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::debug;

use crate::class::{LoxClass, LoxFunction, LoxInstance};
use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::natives;
use crate::session::Session;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local control transfer used as the error type of `execute` and
/// `evaluate`.  `Return` is caught by the function-call frame; `Error`
/// unwinds to `interpret`, which reports it once.  Keeping them in one
/// channel lets `?` drive both while they stay distinguishable by tag.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(err: LoxError) -> Self {
        Unwind::Error(err)
    }
}

type Exec<T> = std::result::Result<T, Unwind>;

/// Tree-walking evaluator.  Owns the globals, the current environment
/// pointer and the resolver-populated side table of binding depths.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_output(Box::new(io::stdout()))
    }

    /// Program `print` output goes to `output`; tests inject a buffer.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define("clock", natives::clock());
        globals
            .borrow_mut()
            .define("List", natives::list_constructor());
        globals
            .borrow_mut()
            .define("Map", natives::map_constructor());

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a binding depth for a resolved expression.  Called by the
    /// resolver before execution begins.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("resolved {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Execute a program.  A runtime error aborts the run, is reported
    /// once, and flips the session's runtime flag.
    pub fn interpret(&mut self, statements: &[Stmt], session: &Session) {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Unwind::Error(err)) => {
                    session.report_runtime(&err);
                    return;
                }

                // The resolver rejects top-level `return`, so nothing can
                // unwind past a function-call frame.
                Err(Unwind::Return(_)) => return,
            }
        }
    }

    // ───────────────────────── statements ─────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` in `env`, restoring the previous environment on
    /// every exit path: normal completion, runtime error, and return
    /// unwinds alike.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], env: Rc<RefCell<Environment>>) -> Exec<()> {
        let previous: Rc<RefCell<Environment>> = std::mem::replace(&mut self.environment, env);

        let result: Exec<()> = statements.iter().try_for_each(|stmt| self.execute(stmt));

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Exec<()> {
        // The name is bound (as nil) before the superclass expression is
        // evaluated, so it stays defined even when that evaluation fails.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };

                    return Err(LoxError::runtime(at, "Superclass must be a class.").into());
                }
            },

            None => None,
        };

        // A subclass's methods close over an extra scope binding `super`.
        let enclosing: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        if let Some(superclass) = &superclass_value {
            let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                &self.environment,
            ))));
            env.borrow_mut()
                .define("super", Value::Class(Rc::clone(superclass)));

            self.environment = env;
        }

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";

            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                is_initializer,
            );

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        if superclass.is_some() {
            self.environment = enclosing;
        }

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
            .map_err(Unwind::from)
    }

    // ───────────────────────── expressions ─────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),

                        _ => Err(LoxError::runtime(operator, "Operand must be a number.").into()),
                    },

                    TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

                    _ => unreachable!("invalid unary operator {:?}", operator.token_type),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                // Short-circuit: the result is the operand value itself,
                // never coerced to a boolean.
                if operator.token_type == TokenType::OR {
                    if is_truthy(&left) {
                        return Ok(left);
                    }
                } else if !is_truthy(&left) {
                    return Ok(left);
                }

                self.evaluate(right)
            }

            Expr::Variable { name, id } => self.lookup_variable(name, *id).map_err(Unwind::from),

            Expr::Assign { name, value, id } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone());
                    }

                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(name, value.clone())
                            .map_err(Unwind::from)?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name).map_err(Unwind::from),

                Value::NativeInstance(instance) => instance.get(name).map_err(Unwind::from),

                _ => Err(LoxError::runtime(name, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value: Value = self.evaluate(value)?;
                    instance.set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name, "Only instances have fields.").into()),
            },

            Expr::This { keyword, id } => self.lookup_variable(keyword, *id).map_err(Unwind::from),

            Expr::Super {
                keyword,
                method,
                id,
            } => self.evaluate_super(keyword, method, *id).map_err(Unwind::from),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => unreachable!("invalid binary operator {:?}", operator.token_type),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Exec<Value> {
        let callee: Value = self.evaluate(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        let arity: usize = match &callee {
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            Value::Native(native) => native.arity,

            _ => {
                return Err(
                    LoxError::runtime(paren, "Can only call functions and classes.").into(),
                );
            }
        };

        if args.len() != arity {
            return Err(LoxError::runtime(
                paren,
                format!("Expected {} arguments but got {}.", arity, args.len()),
            )
            .into());
        }

        match callee {
            Value::Function(function) => function.call(self, args).map_err(Unwind::from),

            Value::Class(class) => class.call(self, args).map_err(Unwind::from),

            Value::Native(native) => (native.func)(&args)
                .map_err(|msg| Unwind::from(LoxError::runtime(paren, msg))),

            _ => unreachable!("arity check already rejected non-callables"),
        }
    }

    fn evaluate_super(&mut self, keyword: &Token, method: &Token, id: ExprId) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Undefined variable 'super'."))?;

        let superclass: Rc<LoxClass> =
            match environment::get_at(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,
                _ => return Err(LoxError::runtime(keyword, "Undefined variable 'super'.")),
            };

        // `this` lives in the implicit scope just inside the `super` one.
        let object: Rc<LoxInstance> =
            match environment::get_at(&self.environment, distance - 1, "this") {
                Some(Value::Instance(instance)) => instance,
                _ => return Err(LoxError::runtime(keyword, "Undefined variable 'this'.")),
            };

        let method: Rc<LoxFunction> = superclass.find_method(&method.lexeme).ok_or_else(|| {
            LoxError::runtime(method, format!("Undefined property '{}'.", method.lexeme))
        })?;

        Ok(Value::Function(Rc::new(method.bind(object))))
    }

    fn lookup_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| {
                    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
                }),

            None => self.globals.borrow().get(name),
        }
    }

    #[cfg(test)]
    pub(crate) fn environment_is_globals(&self) -> bool {
        Rc::ptr_eq(&self.environment, &self.globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn run_source(source: &str, interpreter: &mut Interpreter) -> (bool, bool) {
        let session = Session::new();
        let tokens: Vec<Token> = Scanner::new(source).filter_map(|r| r.ok()).collect();
        let statements = Parser::new(tokens, &session).parse();
        assert!(!session.had_error(), "parse failed for {:?}", source);

        Resolver::new(interpreter, &session).resolve(&statements);
        assert!(!session.had_error(), "resolve failed for {:?}", source);

        interpreter.interpret(&statements, &session);
        (session.had_error(), session.had_runtime_error())
    }

    fn quiet_interpreter() -> Interpreter {
        Interpreter::with_output(Box::new(io::sink()))
    }

    #[test]
    fn environment_is_balanced_after_normal_completion() {
        let mut interpreter = quiet_interpreter();
        let (_, runtime) = run_source("{ var a = 1; { var b = 2; print a + b; } }", &mut interpreter);

        assert!(!runtime);
        assert!(interpreter.environment_is_globals());
    }

    #[test]
    fn environment_is_balanced_after_a_runtime_error() {
        let mut interpreter = quiet_interpreter();
        let (_, runtime) = run_source("{ var a = 1; { print a + \"x\"; } }", &mut interpreter);

        assert!(runtime);
        assert!(interpreter.environment_is_globals());
    }

    #[test]
    fn environment_is_balanced_after_return_unwinds() {
        let mut interpreter = quiet_interpreter();
        let (_, runtime) = run_source("fun f() { { { return 1; } } } print f();", &mut interpreter);

        assert!(!runtime);
        assert!(interpreter.environment_is_globals());
    }

    #[test]
    fn division_by_zero_follows_ieee754() {
        // No special-casing: 1/0 is infinity, 0/0 is NaN (and NaN != NaN).
        let mut interpreter = quiet_interpreter();
        let (_, runtime) = run_source(
            "print 1 / 0; print (0 / 0) == (0 / 0);",
            &mut interpreter,
        );

        assert!(!runtime);
    }
}

/// `nil` and `false` are falsey; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn number_operands(operator: &Token, left: Value, right: Value) -> Exec<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),

        _ => Err(LoxError::runtime(operator, "Operands must be numbers.").into()),
    }
}
