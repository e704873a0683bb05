//! Runtime representations of user-defined functions, classes and
//! instances.
//!
//! Functions capture their defining environment; method access binds a
//! fresh environment that maps `this` to the receiving instance.  Classes
//! hold their method table and an optional superclass; instances hold a
//! field map consulted before the method tables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::environment::{self, Environment};
use crate::error::{LoxError, Result};
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this function whose closure maps `this` to `instance`.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));
        env.borrow_mut().define("this", Value::Instance(instance));

        LoxFunction::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }

    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            env.borrow_mut().define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, env) {
            Ok(()) => {}

            Err(Unwind::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
                // A bare `return;` in an initializer still yields `this`;
                // `return expr;` was rejected by the resolver.
            }

            Err(Unwind::Error(err)) => return Err(err),
        }

        if self.is_initializer {
            return Ok(environment::get_at(&self.closure, 0, "this")
                .expect("initializer closure always binds 'this'"));
        }

        Ok(Value::Nil)
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    /// Own method table first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's arity is its initializer's, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Calling a class constructs an instance and runs `init` bound to it.
    pub fn call(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let instance: Rc<LoxInstance> = LoxInstance::new(Rc::clone(self));

        if let Some(init) = self.find_method("init") {
            init.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Rc<Self> {
        Rc::new(LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Property access: fields shadow methods.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(LoxError::runtime(
            name,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}
