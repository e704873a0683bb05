use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// One link in the scope chain: a name→value map plus an optional
/// enclosing environment.  Shared ownership (`Rc<RefCell<_>>`) because
/// closures keep their defining environment alive after the block that
/// created it has exited.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LoxError::runtime(
                name,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }
}

/// Walk `distance` enclosing links from `env`.
///
/// The resolver guarantees the chain is at least that deep for every
/// recorded binding, so running out of ancestors is a crate bug, not a
/// user error.
pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
    let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

    for _ in 0..distance {
        let next = current
            .borrow()
            .enclosing
            .clone()
            .unwrap_or_else(|| panic!("scope chain shallower than resolved depth {}", distance));
        current = next;
    }

    current
}

/// Depth-directed read: the resolver told us exactly which ancestor holds
/// the binding.
pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
    ancestor(env, distance).borrow().values.get(name).cloned()
}

/// Depth-directed write.
pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token, value: Value) {
    ancestor(env, distance)
        .borrow_mut()
        .values
        .insert(name.lexeme.clone(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name.to_string(), 1)
    }

    #[test]
    fn get_walks_the_chain() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &globals,
        ))));

        assert_eq!(inner.borrow().get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_writes_to_the_defining_scope() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &globals,
        ))));

        inner
            .borrow_mut()
            .assign(&ident("x"), Value::Number(2.0))
            .unwrap();

        assert_eq!(
            globals.borrow().get(&ident("x")).unwrap(),
            Value::Number(2.0)
        );
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let env = Environment::new();

        assert!(matches!(
            env.get(&ident("missing")),
            Err(LoxError::Runtime { .. })
        ));
    }

    #[test]
    fn get_at_reads_the_exact_ancestor() {
        let globals = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("x", Value::Number(0.0));

        let mut env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &globals,
        ))));
        env.borrow_mut().define("x", Value::Number(1.0));

        for depth in 2..=60 {
            env = Rc::new(RefCell::new(Environment::with_enclosing(env)));
            env.borrow_mut().define("x", Value::Number(depth as f64));
        }

        // Innermost shadows; the depth-directed read skips the shadows.
        assert_eq!(get_at(&env, 0, "x"), Some(Value::Number(60.0)));
        assert_eq!(get_at(&env, 59, "x"), Some(Value::Number(1.0)));
        assert_eq!(get_at(&env, 60, "x"), Some(Value::Number(0.0)));
    }
}
