//! Runtime values
//!
//! Containers are reference types (`Rc<RefCell<..>>`) so aliasing behaves as
//! in Python: `b = a; b.append(1)` is visible through `a`. Values never cross
//! threads; the whole interpreter lives on the execution thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

use indexmap::IndexMap;

use super::builtins::Builtin;
use super::scope::Scope;
use crate::ast::Stmt;
use crate::error::{ExcKind, Exception, RuntimeError};

pub type Dict = IndexMap<Key, Value>;
pub type Attrs = RefCell<HashMap<String, Value>>;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<Dict>>),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    /// User function bound to a receiver (`obj.method`)
    Method(Rc<Method>),
    Builtin(Builtin),
    /// Built-in method bound to a container (`items.append`)
    NativeMethod(Rc<NativeMethod>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Module(Rc<Module>),
    ExceptionType(ExcKind),
    Exception(Rc<Exception>),
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<[Stmt]>,
    /// Locals of the enclosing function, when defined inside one
    pub closure: Option<Rc<Scope>>,
}

#[derive(Debug)]
pub struct Method {
    pub receiver: Value,
    pub function: Rc<Function>,
}

#[derive(Debug)]
pub struct NativeMethod {
    pub receiver: Value,
    pub name: &'static str,
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub attrs: Attrs,
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    pub attrs: Attrs,
}

#[derive(Debug)]
pub struct Module {
    pub name: &'static str,
    pub attrs: HashMap<&'static str, Value>,
}

/// Hashable projection of a value, used as a dict key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Tuple(Vec<Key>),
}

impl Key {
    /// # Errors
    /// `TypeError` for mutable or non-integral values
    pub fn from_value(value: &Value) -> Result<Self, RuntimeError> {
        Ok(match value {
            Value::None => Key::None,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Key::Int(*f as i64),
            Value::Str(s) => Key::Str(s.clone()),
            Value::Tuple(items) => {
                Key::Tuple(items.iter().map(Key::from_value).collect::<Result<_, _>>()?)
            }
            other => {
                return Err(RuntimeError::new(
                    ExcKind::TypeError,
                    format!("unhashable type: '{}'", other.type_name()),
                ))
            }
        })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Tuple(items) => Value::Tuple(items.iter().map(Key::to_value).collect()),
        }
    }
}

impl Value {
    #[must_use]
    pub fn str(text: &str) -> Self {
        Value::Str(Rc::from(text))
    }

    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn type_name(&self) -> String {
        let name = match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Method(_) => "method",
            Value::Builtin(_) | Value::NativeMethod(_) => "builtin_function_or_method",
            Value::Class(_) | Value::ExceptionType(_) => "type",
            Value::Module(_) => "module",
            Value::Instance(instance) => return instance.class.name.clone(),
            Value::Exception(exc) => exc.kind.name(),
        };
        name.to_string()
    }

    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Range { .. } => range_len(self) > 0,
            _ => true,
        }
    }

    /// `str(value)`
    #[must_use]
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(exc) => exc.message.clone(),
            other => other.repr(),
        }
    }

    /// `repr(value)`
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => quote(s),
            Value::List(items) => format!("[{}]", join_repr(items.borrow().iter())),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items.iter())),
            Value::Dict(entries) => {
                let mut out = String::from("{");
                for (idx, (key, value)) in entries.borrow().iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: {}", key.to_value().repr(), value.repr());
                }
                out.push('}');
                out
            }
            Value::Range { start, stop, step } if *step == 1 => format!("range({start}, {stop})"),
            Value::Range { start, stop, step } => format!("range({start}, {stop}, {step})"),
            Value::Function(func) => format!("<function {}>", func.name),
            Value::Method(method) => {
                format!("<bound method {} of {}>", method.function.name, method.receiver.repr())
            }
            Value::Builtin(builtin) => format!("<built-in function {}>", builtin.name()),
            Value::NativeMethod(method) => {
                format!("<built-in method {} of {} object>", method.name, method.receiver.type_name())
            }
            Value::Class(class) => format!("<class '{}'>", class.name),
            Value::Instance(instance) => format!("<{} object>", instance.class.name),
            Value::Module(module) => format!("<module '{}'>", module.name),
            Value::ExceptionType(kind) => format!("<class '{kind}'>"),
            Value::Exception(exc) => format!("{}({})", exc.kind, quote(&exc.message)),
        }
    }
}

fn join_repr<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Python-style float formatting: integral values keep a trailing `.0`
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Number of elements a range yields
#[must_use]
pub fn range_len(value: &Value) -> i64 {
    match *value {
        Value::Range { start, stop, step } if step > 0 && stop > start => {
            (stop - start + step - 1) / step
        }
        Value::Range { start, stop, step } if step < 0 && stop < start => {
            (start - stop - step - 1) / -step
        }
        _ => 0,
    }
}

/// Iterator over an iterable value
///
/// Lists are walked by index against the live vector, so appending inside a
/// `for` loop extends the iteration like it does in Python.
pub enum ValueIter {
    Range { next: i64, stop: i64, step: i64 },
    List { items: Rc<RefCell<Vec<Value>>>, index: usize },
    Items { items: std::vec::IntoIter<Value> },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Range { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let value = *next;
                *next = next.saturating_add(*step);
                Some(Value::Int(value))
            }
            ValueIter::List { items, index } => {
                let value = items.borrow().get(*index).cloned();
                *index += 1;
                value
            }
            ValueIter::Items { items } => items.next(),
        }
    }
}

/// `iter(value)`
///
/// # Errors
/// `TypeError` if the value is not iterable
pub fn iterate(value: &Value) -> Result<ValueIter, RuntimeError> {
    Ok(match value {
        Value::Range { start, stop, step } => ValueIter::Range { next: *start, stop: *stop, step: *step },
        Value::List(items) => ValueIter::List { items: items.clone(), index: 0 },
        Value::Tuple(items) => ValueIter::Items { items: items.to_vec().into_iter() },
        Value::Str(text) => ValueIter::Items {
            items: text.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect::<Vec<_>>().into_iter(),
        },
        Value::Dict(entries) => ValueIter::Items {
            items: entries.borrow().keys().map(Key::to_value).collect::<Vec<_>>().into_iter(),
        },
        other => {
            return Err(RuntimeError::new(
                ExcKind::TypeError,
                format!("'{}' object is not iterable", other.type_name()),
            ))
        }
    })
}
