//! Built-in functions, container methods and importable modules

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use super::ops::{self, as_float, as_int};
use super::value::{iterate, range_len, Key, Module, NativeMethod, Value};
use super::Host;
use crate::error::{ExcKind, Exception, RuntimeError};

type CallResult = Result<Value, RuntimeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Len,
    Range,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    Abs,
    Min,
    Max,
    Sum,
    Round,
    List,
    Tuple,
    Dict,
    Sorted,
    Enumerate,
    Zip,
    Isinstance,
    // time
    Sleep,
    Monotonic,
    PerfCounter,
    Time,
    // math
    Sqrt,
    Floor,
    Ceil,
}

/// Builtins visible without an import
const GLOBALS: &[Builtin] = &[
    Builtin::Print,
    Builtin::Len,
    Builtin::Range,
    Builtin::Str,
    Builtin::Repr,
    Builtin::Int,
    Builtin::Float,
    Builtin::Bool,
    Builtin::Abs,
    Builtin::Min,
    Builtin::Max,
    Builtin::Sum,
    Builtin::Round,
    Builtin::List,
    Builtin::Tuple,
    Builtin::Dict,
    Builtin::Sorted,
    Builtin::Enumerate,
    Builtin::Zip,
    Builtin::Isinstance,
];

const LIST_METHODS: &[&str] =
    &["append", "pop", "extend", "insert", "index", "count", "clear", "reverse", "sort", "copy"];
const DICT_METHODS: &[&str] = &["get", "keys", "values", "items", "pop", "clear", "copy"];
const STR_METHODS: &[&str] =
    &["join", "upper", "lower", "strip", "split", "startswith", "endswith", "replace", "find"];

impl Builtin {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Round => "round",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Sorted => "sorted",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Isinstance => "isinstance",
            Builtin::Sleep => "sleep",
            Builtin::Monotonic => "monotonic",
            Builtin::PerfCounter => "perf_counter",
            Builtin::Time => "time",
            Builtin::Sqrt => "sqrt",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
        }
    }
}

/// Resolve a name against the builtin namespace
#[must_use]
pub fn lookup(name: &str) -> Option<Value> {
    GLOBALS
        .iter()
        .find(|builtin| builtin.name() == name)
        .map(|&builtin| Value::Builtin(builtin))
        .or_else(|| ExcKind::from_name(name).map(Value::ExceptionType))
}

/// Build one of the importable modules
#[must_use]
pub fn import(name: &str) -> Option<Module> {
    let (name, functions, constants): (&'static str, &[Builtin], Vec<(&'static str, f64)>) = match name {
        "time" => (
            "time",
            &[Builtin::Sleep, Builtin::Monotonic, Builtin::PerfCounter, Builtin::Time],
            Vec::new(),
        ),
        "math" => (
            "math",
            &[Builtin::Sqrt, Builtin::Floor, Builtin::Ceil],
            vec![("pi", std::f64::consts::PI), ("e", std::f64::consts::E), ("inf", f64::INFINITY)],
        ),
        _ => return None,
    };
    let mut attrs: HashMap<&'static str, Value> =
        functions.iter().map(|&f| (f.name(), Value::Builtin(f))).collect();
    attrs.extend(constants.into_iter().map(|(key, value)| (key, Value::Float(value))));
    Some(Module { name, attrs })
}

/// Bind a container method, if the receiver has one by that name
#[must_use]
pub fn native_method(receiver: &Value, attr: &str) -> Option<Value> {
    let table = match receiver {
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Str(_) => STR_METHODS,
        _ => return None,
    };
    table.iter().find(|&&name| name == attr).map(|&name| {
        Value::NativeMethod(Rc::new(NativeMethod { receiver: receiver.clone(), name }))
    })
}

/// Exception instance produced by calling an exception type
#[must_use]
pub fn new_exception(kind: ExcKind, args: &[Value]) -> Exception {
    let message = match args {
        [] => String::new(),
        [single] => single.to_str(),
        many => Value::Tuple(Rc::from(many.to_vec())).repr(),
    };
    Exception::new(kind, message)
}

// ============================================================================
// Argument helpers
// ============================================================================

fn type_error(message: String) -> RuntimeError {
    RuntimeError::new(ExcKind::TypeError, message)
}

fn value_error(message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ExcKind::ValueError, message)
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), RuntimeError> {
    let given = args.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    Err(type_error(if min == max {
        let plural = if min == 1 { "" } else { "s" };
        format!("{name}() takes exactly {min} argument{plural} ({given} given)")
    } else if given < min {
        format!("{name}() expected at least {min} arguments, got {given}")
    } else {
        format!("{name}() expected at most {max} arguments, got {given}")
    }))
}

fn int_arg(name: &str, value: &Value) -> Result<i64, RuntimeError> {
    as_int(value).ok_or_else(|| {
        type_error(format!("{name}() argument must be an integer, not '{}'", value.type_name()))
    })
}

fn float_arg(name: &str, value: &Value) -> Result<f64, RuntimeError> {
    as_float(value).ok_or_else(|| {
        type_error(format!("{name}() argument must be a number, not '{}'", value.type_name()))
    })
}

fn str_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Str(text) => Ok(text),
        other => Err(type_error(format!("{name}() argument must be str, not {}", other.type_name()))),
    }
}

fn collect(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    Ok(iterate(value)?.collect())
}

/// Convert an integral float to an int
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(value: f64) -> Result<i64, RuntimeError> {
    if value.is_nan() {
        return Err(value_error("cannot convert float NaN to integer"));
    }
    if value.is_infinite() || value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return Err(RuntimeError::new(ExcKind::OverflowError, "cannot convert float infinity to integer"));
    }
    Ok(value as i64)
}

fn sort_values(items: &mut [Value]) -> Result<(), RuntimeError> {
    let mut failure = None;
    items.sort_by(|a, b| match ops::order(a, b) {
        Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    failure.map_or(Ok(()), Err)
}

fn extreme(name: &str, args: Vec<Value>, wanted: Ordering) -> CallResult {
    let candidates = match args.len() {
        0 => return Err(type_error(format!("{name} expected at least 1 argument, got 0"))),
        1 => collect(&args[0])?,
        _ => args,
    };
    let mut best: Option<Value> = None;
    for candidate in candidates {
        best = Some(match best {
            Some(current) if ops::order(&candidate, &current)? != Some(wanted) => current,
            _ => candidate,
        });
    }
    best.ok_or_else(|| value_error(format!("{name}() arg is an empty sequence")))
}

fn round_value(args: &[Value]) -> CallResult {
    let number = &args[0];
    match args.get(1) {
        None | Some(Value::None) => match number {
            Value::Float(f) => Ok(Value::Int(float_to_int(f.round_ties_even())?)),
            other => Ok(Value::Int(int_arg("round", other)?)),
        },
        Some(digits) => {
            let digits = i32::try_from(int_arg("round", digits)?).unwrap_or(0);
            match number {
                Value::Float(f) => {
                    let scale = 10f64.powi(digits);
                    Ok(Value::Float((f * scale).round_ties_even() / scale))
                }
                other => Ok(Value::Int(int_arg("round", other)?)),
            }
        }
    }
}

fn to_int(args: &[Value]) -> CallResult {
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Float(f) => Ok(Value::Int(float_to_int(f.trunc())?)),
        Value::Str(text) => {
            let cleaned: String = text.trim().chars().filter(|&c| c != '_').collect();
            cleaned.parse().map(Value::Int).map_err(|_| {
                value_error(format!("invalid literal for int() with base 10: {}", value.repr()))
            })
        }
        other => as_int(other).map(Value::Int).ok_or_else(|| {
            type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn to_float(args: &[Value]) -> CallResult {
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(text) => text
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| value_error(format!("could not convert string to float: {}", value.repr()))),
        other => as_float(other).map(Value::Float).ok_or_else(|| {
            type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn isinstance(value: &Value, filter: &Value) -> Result<bool, RuntimeError> {
    Ok(match filter {
        Value::Tuple(options) => {
            for option in options.iter() {
                if isinstance(value, option)? {
                    return Ok(true);
                }
            }
            false
        }
        Value::ExceptionType(kind) => {
            matches!(value, Value::Exception(exc) if exc.kind.is_subclass_of(*kind))
        }
        Value::Class(class) => {
            matches!(value, Value::Instance(instance) if Rc::ptr_eq(&instance.class, class))
        }
        Value::Builtin(Builtin::Int) => as_int(value).is_some(),
        Value::Builtin(
            builtin @ (Builtin::Float
            | Builtin::Str
            | Builtin::Bool
            | Builtin::List
            | Builtin::Tuple
            | Builtin::Dict),
        ) => value.type_name() == builtin.name(),
        _ => return Err(type_error("isinstance() arg 2 must be a type or tuple of types".to_string())),
    })
}

// ============================================================================
// Dispatch
// ============================================================================

/// Call a builtin function
///
/// # Errors
/// Whatever exception the builtin raises for its arguments.
#[allow(clippy::too_many_lines)]
pub fn call(host: &mut Host, builtin: Builtin, args: Vec<Value>) -> CallResult {
    let name = builtin.name();
    match builtin {
        Builtin::Print => {
            let text: Vec<String> = args.iter().map(Value::to_str).collect();
            host.print(&text.join(" "))?;
            Ok(Value::None)
        }
        Builtin::Len => {
            arity(name, &args, 1, 1)?;
            let len = match &args[0] {
                Value::Str(text) => text.chars().count(),
                Value::List(items) => items.borrow().len(),
                Value::Tuple(items) => items.len(),
                Value::Dict(entries) => entries.borrow().len(),
                range @ Value::Range { .. } => usize::try_from(range_len(range)).unwrap_or(0),
                other => {
                    return Err(type_error(format!("object of type '{}' has no len()", other.type_name())))
                }
            };
            Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        }
        Builtin::Range => {
            arity(name, &args, 1, 3)?;
            let ints = args.iter().map(|arg| int_arg(name, arg)).collect::<Result<Vec<_>, _>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => unreachable!("arity checked"),
            };
            if step == 0 {
                return Err(value_error("range() arg 3 must not be zero"));
            }
            Ok(Value::Range { start, stop, step })
        }
        Builtin::Str => {
            arity(name, &args, 0, 1)?;
            Ok(Value::str(&args.first().map(Value::to_str).unwrap_or_default()))
        }
        Builtin::Repr => {
            arity(name, &args, 1, 1)?;
            Ok(Value::str(&args[0].repr()))
        }
        Builtin::Int => {
            arity(name, &args, 0, 1)?;
            to_int(&args)
        }
        Builtin::Float => {
            arity(name, &args, 0, 1)?;
            to_float(&args)
        }
        Builtin::Bool => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }
        Builtin::Abs => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => int_arg(name, other)?
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::new(ExcKind::OverflowError, "integer overflow")),
            }
        }
        Builtin::Min => extreme(name, args, Ordering::Less),
        Builtin::Max => extreme(name, args, Ordering::Greater),
        Builtin::Sum => {
            arity(name, &args, 1, 2)?;
            let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
            for item in iterate(&args[0])? {
                total = ops::binary(crate::ast::BinOp::Add, &total, &item)?;
            }
            Ok(total)
        }
        Builtin::Round => {
            arity(name, &args, 1, 2)?;
            round_value(&args)
        }
        Builtin::List => {
            arity(name, &args, 0, 1)?;
            Ok(Value::list(match args.first() {
                Some(iterable) => collect(iterable)?,
                None => Vec::new(),
            }))
        }
        Builtin::Tuple => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Tuple(Rc::from(match args.first() {
                Some(iterable) => collect(iterable)?,
                None => Vec::new(),
            })))
        }
        Builtin::Dict => {
            arity(name, &args, 0, 1)?;
            let mut entries = IndexMap::new();
            if let Some(pairs) = args.first() {
                for pair in iterate(pairs)? {
                    let [key, value]: [Value; 2] = collect(&pair)?.try_into().map_err(|_| {
                        value_error("dictionary update sequence element has wrong length")
                    })?;
                    entries.insert(Key::from_value(&key)?, value);
                }
            }
            Ok(Value::Dict(Rc::new(RefCell::new(entries))))
        }
        Builtin::Sorted => {
            arity(name, &args, 1, 1)?;
            let mut items = collect(&args[0])?;
            sort_values(&mut items)?;
            Ok(Value::list(items))
        }
        Builtin::Enumerate => {
            arity(name, &args, 1, 2)?;
            let start = args.get(1).map(|v| int_arg(name, v)).transpose()?.unwrap_or(0);
            let pairs = iterate(&args[0])?
                .zip(start..)
                .map(|(item, index)| Value::Tuple(Rc::from(vec![Value::Int(index), item])))
                .collect();
            Ok(Value::list(pairs))
        }
        Builtin::Zip => {
            let columns = args.iter().map(collect).collect::<Result<Vec<_>, _>>()?;
            let len = columns.iter().map(Vec::len).min().unwrap_or(0);
            let rows = (0..len)
                .map(|row| Value::Tuple(columns.iter().map(|column| column[row].clone()).collect()))
                .collect();
            Ok(Value::list(rows))
        }
        Builtin::Isinstance => {
            arity(name, &args, 2, 2)?;
            Ok(Value::Bool(isinstance(&args[0], &args[1])?))
        }
        Builtin::Sleep => {
            arity(name, &args, 1, 1)?;
            let secs = float_arg(name, &args[0])?;
            if secs < 0.0 {
                return Err(value_error("sleep length must be non-negative"));
            }
            let duration = Duration::try_from_secs_f64(secs)
                .map_err(|_| RuntimeError::new(ExcKind::OverflowError, "sleep length is too large"))?;
            std::thread::sleep(duration);
            Ok(Value::None)
        }
        Builtin::Monotonic | Builtin::PerfCounter => {
            arity(name, &args, 0, 0)?;
            Ok(Value::Float(host.epoch.elapsed().as_secs_f64()))
        }
        Builtin::Time => {
            arity(name, &args, 0, 0)?;
            let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
            Ok(Value::Float(now.as_secs_f64()))
        }
        Builtin::Sqrt => {
            arity(name, &args, 1, 1)?;
            let x = float_arg(name, &args[0])?;
            if x < 0.0 {
                return Err(value_error("math domain error"));
            }
            Ok(Value::Float(x.sqrt()))
        }
        Builtin::Floor | Builtin::Ceil => {
            arity(name, &args, 1, 1)?;
            if let Some(i) = as_int(&args[0]) {
                return Ok(Value::Int(i));
            }
            let x = float_arg(name, &args[0])?;
            let rounded = if builtin == Builtin::Floor { x.floor() } else { x.ceil() };
            Ok(Value::Int(float_to_int(rounded)?))
        }
    }
}

/// Call a method bound to a list, dict or str
///
/// # Errors
/// Whatever exception the method raises for its arguments.
#[allow(clippy::too_many_lines)]
pub fn call_method(receiver: &Value, name: &'static str, args: Vec<Value>) -> CallResult {
    match receiver {
        Value::List(items) => match name {
            "append" => {
                arity(name, &args, 1, 1)?;
                items.borrow_mut().extend(args);
                Ok(Value::None)
            }
            "extend" => {
                arity(name, &args, 1, 1)?;
                let extra = collect(&args[0])?;
                items.borrow_mut().extend(extra);
                Ok(Value::None)
            }
            "insert" => {
                arity(name, &args, 2, 2)?;
                let mut items = items.borrow_mut();
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let index = int_arg(name, &args[0])?;
                let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(usize::try_from(index).unwrap_or(0), args[1].clone());
                Ok(Value::None)
            }
            "pop" => {
                arity(name, &args, 0, 1)?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::new(ExcKind::IndexError, "pop from empty list"));
                }
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let index = args.first().map(|v| int_arg(name, v)).transpose()?.unwrap_or(-1);
                let index = if index < 0 { index + len } else { index };
                if !(0..len).contains(&index) {
                    return Err(RuntimeError::new(ExcKind::IndexError, "pop index out of range"));
                }
                Ok(items.remove(usize::try_from(index).unwrap_or(0)))
            }
            "index" => {
                arity(name, &args, 1, 1)?;
                let position = items.borrow().iter().position(|v| ops::equals(v, &args[0]));
                position
                    .map(|p| Value::Int(i64::try_from(p).unwrap_or(i64::MAX)))
                    .ok_or_else(|| value_error(format!("{} is not in list", args[0].repr())))
            }
            "count" => {
                arity(name, &args, 1, 1)?;
                let count = items.borrow().iter().filter(|v| ops::equals(v, &args[0])).count();
                Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
            }
            "clear" => {
                arity(name, &args, 0, 0)?;
                items.borrow_mut().clear();
                Ok(Value::None)
            }
            "reverse" => {
                arity(name, &args, 0, 0)?;
                items.borrow_mut().reverse();
                Ok(Value::None)
            }
            "sort" => {
                arity(name, &args, 0, 0)?;
                let mut sorted = items.borrow().clone();
                sort_values(&mut sorted)?;
                *items.borrow_mut() = sorted;
                Ok(Value::None)
            }
            "copy" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::list(items.borrow().clone()))
            }
            _ => Err(missing_method(receiver, name)),
        },
        Value::Dict(entries) => match name {
            "get" => {
                arity(name, &args, 1, 2)?;
                let key = Key::from_value(&args[0])?;
                let found = entries.borrow().get(&key).cloned();
                Ok(found.or_else(|| args.get(1).cloned()).unwrap_or(Value::None))
            }
            "keys" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::list(entries.borrow().keys().map(Key::to_value).collect()))
            }
            "values" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::list(entries.borrow().values().cloned().collect()))
            }
            "items" => {
                arity(name, &args, 0, 0)?;
                let pairs = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| Value::Tuple(Rc::from(vec![key.to_value(), value.clone()])))
                    .collect();
                Ok(Value::list(pairs))
            }
            "pop" => {
                arity(name, &args, 1, 2)?;
                let key = Key::from_value(&args[0])?;
                let removed = entries.borrow_mut().shift_remove(&key);
                removed
                    .or_else(|| args.get(1).cloned())
                    .ok_or_else(|| RuntimeError::new(ExcKind::KeyError, args[0].repr()))
            }
            "clear" => {
                arity(name, &args, 0, 0)?;
                entries.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::Dict(Rc::new(RefCell::new(entries.borrow().clone()))))
            }
            _ => Err(missing_method(receiver, name)),
        },
        Value::Str(text) => str_method(text, name, &args),
        _ => Err(missing_method(receiver, name)),
    }
}

fn str_method(text: &str, name: &'static str, args: &[Value]) -> CallResult {
    match name {
        "join" => {
            arity(name, args, 1, 1)?;
            let mut parts = Vec::new();
            for (index, item) in iterate(&args[0])?.enumerate() {
                match item {
                    Value::Str(part) => parts.push(part.to_string()),
                    other => {
                        return Err(type_error(format!(
                            "sequence item {index}: expected str instance, {} found",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::str(&parts.join(text)))
        }
        "upper" => Ok(Value::str(&text.to_uppercase())),
        "lower" => Ok(Value::str(&text.to_lowercase())),
        "strip" => Ok(Value::str(text.trim())),
        "split" => {
            arity(name, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => text.split_whitespace().map(Value::str).collect(),
                Some(sep) => {
                    let sep = str_arg(name, sep)?;
                    if sep.is_empty() {
                        return Err(value_error("empty separator"));
                    }
                    text.split(sep).map(Value::str).collect()
                }
            };
            Ok(Value::list(parts))
        }
        "startswith" | "endswith" => {
            arity(name, args, 1, 1)?;
            let affix = str_arg(name, &args[0])?;
            Ok(Value::Bool(if name == "startswith" {
                text.starts_with(affix)
            } else {
                text.ends_with(affix)
            }))
        }
        "replace" => {
            arity(name, args, 2, 2)?;
            Ok(Value::str(&text.replace(str_arg(name, &args[0])?, str_arg(name, &args[1])?)))
        }
        "find" => {
            arity(name, args, 1, 1)?;
            let needle = str_arg(name, &args[0])?;
            let index = text.find(needle).map_or(-1, |byte| {
                i64::try_from(text[..byte].chars().count()).unwrap_or(i64::MAX)
            });
            Ok(Value::Int(index))
        }
        _ => Err(missing_method(&Value::str(text), name)),
    }
}

fn missing_method(receiver: &Value, name: &str) -> RuntimeError {
    RuntimeError::new(
        ExcKind::AttributeError,
        format!("'{}' object has no attribute '{name}'", receiver.type_name()),
    )
}
