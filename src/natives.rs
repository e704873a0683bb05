//! Native callables installed in the global environment: `clock`, and the
//! `List` / `Map` collection constructors.
//!
//! Collection instances answer property access with bound native methods,
//! mirroring how user instances bind their class methods.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// A built-in function.  The body reports failures as bare messages; the
/// interpreter attaches the call site's line when converting them to
/// runtime errors.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: Box<dyn Fn(&[Value]) -> std::result::Result<Value, String>>,
}

impl NativeFunction {
    fn new<F>(name: &str, arity: usize, func: F) -> Value
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        Value::Native(Rc::new(NativeFunction {
            name: name.to_string(),
            arity,
            func: Box::new(func),
        }))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// `clock()` -> seconds since the Unix epoch as a double.
pub fn clock() -> Value {
    NativeFunction::new("clock", 0, |_args| {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| format!("Clock error: {}.", e))?;

        Ok(Value::Number(now.as_secs_f64()))
    })
}

/// `List()` -> empty list instance.
pub fn list_constructor() -> Value {
    NativeFunction::new("List", 0, |_args| {
        Ok(Value::NativeInstance(Rc::new(NativeInstance {
            data: NativeData::List(RefCell::new(Vec::new())),
        })))
    })
}

/// `Map()` -> empty map instance.
pub fn map_constructor() -> Value {
    NativeFunction::new("Map", 0, |_args| {
        Ok(Value::NativeInstance(Rc::new(NativeInstance {
            data: NativeData::Map(RefCell::new(HashMap::new())),
        })))
    })
}

/// Map keys must be hashable: primitives only.  Numbers compare by bit
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey {
    Nil,
    Bool(bool),
    Number(u64),
    Str(String),
}

fn map_key(value: &Value) -> std::result::Result<MapKey, String> {
    match value {
        Value::Nil => Ok(MapKey::Nil),

        Value::Bool(b) => Ok(MapKey::Bool(*b)),

        Value::Number(n) => Ok(MapKey::Number(n.to_bits())),

        Value::String(s) => Ok(MapKey::Str(s.clone())),

        other => Err(format!(
            "Cannot use a {} as a Map key.",
            other.type_name()
        )),
    }
}

#[derive(Debug)]
enum NativeData {
    List(RefCell<Vec<Value>>),
    Map(RefCell<HashMap<MapKey, Value>>),
}

#[derive(Debug)]
pub struct NativeInstance {
    data: NativeData,
}

impl NativeInstance {
    /// Property access on a native instance: every known name binds a
    /// method over this instance; unknown names are runtime errors, and
    /// there are no assignable fields.
    pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value> {
        let method: Option<Value> = match &self.data {
            NativeData::List(_) => self.list_method(&name.lexeme),
            NativeData::Map(_) => self.map_method(&name.lexeme),
        };

        method.ok_or_else(|| {
            LoxError::runtime(name, format!("Undefined property '{}'.", name.lexeme))
        })
    }

    fn list_method(self: &Rc<Self>, name: &str) -> Option<Value> {
        let instance: Rc<NativeInstance> = Rc::clone(self);

        match name {
            "append" => Some(NativeFunction::new("append", 1, move |args| {
                instance.list().borrow_mut().push(args[0].clone());
                Ok(Value::Nil)
            })),

            "get" => Some(NativeFunction::new("get", 1, move |args| {
                let &Value::Number(index) = &args[0] else {
                    return Err(format!(
                        "Cannot index into List with parameter of type '{}'.",
                        args[0].type_name()
                    ));
                };

                let values = instance.list().borrow();
                let idx = index as usize;

                if index < 0.0 || idx >= values.len() {
                    return Err(format!(
                        "Index out of range [{}] with length {}.",
                        index,
                        values.len()
                    ));
                }

                Ok(values[idx].clone())
            })),

            "size" => Some(NativeFunction::new("size", 0, move |_args| {
                Ok(Value::Number(instance.list().borrow().len() as f64))
            })),

            _ => None,
        }
    }

    fn map_method(self: &Rc<Self>, name: &str) -> Option<Value> {
        let instance: Rc<NativeInstance> = Rc::clone(self);

        match name {
            "put" => Some(NativeFunction::new("put", 2, move |args| {
                let key = map_key(&args[0])?;
                instance.map().borrow_mut().insert(key, args[1].clone());
                Ok(Value::Nil)
            })),

            "get" => Some(NativeFunction::new("get", 1, move |args| {
                let key = map_key(&args[0])?;
                Ok(instance
                    .map()
                    .borrow()
                    .get(&key)
                    .cloned()
                    .unwrap_or(Value::Nil))
            })),

            "contains" => Some(NativeFunction::new("contains", 1, move |args| {
                let key = map_key(&args[0])?;
                Ok(Value::Bool(instance.map().borrow().contains_key(&key)))
            })),

            "remove" => Some(NativeFunction::new("remove", 1, move |args| {
                let key = map_key(&args[0])?;
                instance.map().borrow_mut().remove(&key);
                Ok(Value::Nil)
            })),

            "size" => Some(NativeFunction::new("size", 0, move |_args| {
                Ok(Value::Number(instance.map().borrow().len() as f64))
            })),

            _ => None,
        }
    }

    fn list(&self) -> &RefCell<Vec<Value>> {
        match &self.data {
            NativeData::List(values) => values,
            NativeData::Map(_) => unreachable!("list method bound to a Map"),
        }
    }

    fn map(&self) -> &RefCell<HashMap<MapKey, Value>> {
        match &self.data {
            NativeData::Map(entries) => entries,
            NativeData::List(_) => unreachable!("map method bound to a List"),
        }
    }
}

impl fmt::Display for NativeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            NativeData::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }

            NativeData::Map(entries) => write!(f, "<Map of {} entries>", entries.borrow().len()),
        }
    }
}
