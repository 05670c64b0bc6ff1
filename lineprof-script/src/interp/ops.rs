//! Operators: arithmetic, comparison, membership and subscripting

use std::cmp::Ordering;
use std::rc::Rc;

use super::value::{range_len, Key, Value};
use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::error::{ExcKind, RuntimeError};

type OpResult = Result<Value, RuntimeError>;

fn type_error(message: String) -> RuntimeError {
    RuntimeError::new(ExcKind::TypeError, message)
}

fn overflow() -> RuntimeError {
    RuntimeError::new(ExcKind::OverflowError, "integer overflow")
}

fn zero_division(message: &str) -> RuntimeError {
    RuntimeError::new(ExcKind::ZeroDivisionError, message)
}

/// Integer view of a value (bools count as ints)
#[must_use]
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Float view of a numeric value
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        other => as_int(other).map(|i| i as f64),
    }
}

/// Largest element (or byte) count a repetition may produce
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Repeat count and result length, or `OverflowError` past [`MAX_REPEAT_LEN`]
fn repeat_len(unit: usize, count: i64) -> Result<(usize, usize), RuntimeError> {
    let count = usize::try_from(count).unwrap_or(0);
    match unit.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok((count, total)),
        _ => Err(RuntimeError::new(ExcKind::OverflowError, "repeated sequence is too long")),
    }
}

fn repeat<T: Clone>(items: &[T], count: i64) -> Result<Vec<T>, RuntimeError> {
    let (count, total) = repeat_len(items.len(), count)?;
    let mut out = Vec::with_capacity(total);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn floor_div(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    Ok(if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
}

fn floor_mod(a: i64, b: i64) -> Result<i64, RuntimeError> {
    if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
    }
    let r = a.checked_rem(b).ok_or_else(overflow)?;
    Ok(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
}

fn int_binary(op: BinOp, a: i64, b: i64) -> OpResult {
    Ok(match op {
        BinOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        BinOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        BinOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        BinOp::FloorDiv => Value::Int(floor_div(a, b)?),
        BinOp::Mod => Value::Int(floor_mod(a, b)?),
        #[allow(clippy::cast_precision_loss)]
        BinOp::Div => {
            if b == 0 {
                return Err(zero_division("division by zero"));
            }
            Value::Float(a as f64 / b as f64)
        }
        #[allow(clippy::cast_precision_loss)]
        BinOp::Pow => match u32::try_from(b) {
            Ok(exp) => Value::Int(a.checked_pow(exp).ok_or_else(overflow)?),
            Err(_) if b < 0 => {
                if a == 0 {
                    return Err(zero_division("0.0 cannot be raised to a negative power"));
                }
                Value::Float((a as f64).powf(b as f64))
            }
            Err(_) => return Err(overflow()),
        },
    })
}

fn float_binary(op: BinOp, a: f64, b: f64) -> OpResult {
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division("float modulo"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
    }))
}

/// Evaluate `left op right`
///
/// # Errors
/// `TypeError` for unsupported operand types, `ZeroDivisionError` and
/// `OverflowError` for arithmetic faults.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> OpResult {
    if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
        return int_binary(op, a, b);
    }
    if let (Some(a), Some(b)) = (as_float(left), as_float(right)) {
        return float_binary(op, a, b);
    }
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(&format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if as_int(n).is_some() => {
            let (count, _) = repeat_len(s.len(), as_int(n).unwrap_or(0))?;
            Ok(Value::str(&s.repeat(count)))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if as_int(n).is_some() =>
        {
            Ok(Value::list(repeat(&items.borrow(), as_int(n).unwrap_or(0))?))
        }
        (BinOp::Mul, Value::Tuple(items), n) | (BinOp::Mul, n, Value::Tuple(items))
            if as_int(n).is_some() =>
        {
            Ok(Value::Tuple(Rc::from(repeat(items, as_int(n).unwrap_or(0))?)))
        }
        _ => Err(type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Evaluate a unary operator
///
/// # Errors
/// `TypeError` for non-numeric operands of `-` and `+`.
pub fn unary(op: UnaryOp, operand: &Value) -> OpResult {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (UnaryOp::Neg, value) if as_int(value).is_some() => {
            Ok(Value::Int(as_int(value).unwrap_or(0).checked_neg().ok_or_else(overflow)?))
        }
        (UnaryOp::Pos, value) if as_int(value).is_some() => Ok(Value::Int(as_int(value).unwrap_or(0))),
        (op, value) => {
            let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
            Err(type_error(format!("bad operand type for unary {symbol}: '{}'", value.type_name())))
        }
    }
}

/// Structural equality (`==`)
#[must_use]
pub fn equals(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (as_float(left), as_float(right)) {
        return a == b;
    }
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            Rc::ptr_eq(a, b) || seq_equals(&a.borrow(), &b.borrow())
        }
        (Value::Tuple(a), Value::Tuple(b)) => seq_equals(a, b),
        (Value::Dict(a), Value::Dict(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter().all(|(key, value)| b.get(key).is_some_and(|other| equals(value, other)))
        }
        (
            Value::Range { start: s1, stop: e1, step: t1 },
            Value::Range { start: s2, stop: e2, step: t2 },
        ) => (s1, e1, t1) == (s2, e2, t2),
        (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => is_same(left, right),
    }
}

fn seq_equals(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
}

/// Identity (`is`)
#[must_use]
pub fn is_same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
        (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
        (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => false,
    }
}

/// Ordering for `<`, `min()`, `sorted()`; `None` when unordered (NaN)
///
/// # Errors
/// `TypeError` when the operand types cannot be ordered.
pub fn order(left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeError> {
    if let (Some(a), Some(b)) = (as_int(left), as_int(right)) {
        return Ok(Some(a.cmp(&b)));
    }
    if let (Some(a), Some(b)) = (as_float(left), as_float(right)) {
        return Ok(a.partial_cmp(&b));
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => seq_order(&a.borrow(), &b.borrow()),
        (Value::Tuple(a), Value::Tuple(b)) => seq_order(a, b),
        _ => Err(type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn seq_order(a: &[Value], b: &[Value]) -> Result<Option<Ordering>, RuntimeError> {
    for (x, y) in a.iter().zip(b) {
        if !equals(x, y) {
            return order(x, y);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// Evaluate one link of a (possibly chained) comparison
///
/// # Errors
/// `TypeError` for unordered operand types or non-container `in` operands.
pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    Ok(match op {
        CmpOp::Eq => equals(left, right),
        CmpOp::NotEq => !equals(left, right),
        CmpOp::Is => is_same(left, right),
        CmpOp::IsNot => !is_same(left, right),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Lt => order(left, right)? == Some(Ordering::Less),
        CmpOp::Gt => order(left, right)? == Some(Ordering::Greater),
        CmpOp::LtE => matches!(order(left, right)?, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::GtE => matches!(order(left, right)?, Some(Ordering::Greater | Ordering::Equal)),
    })
}

/// `item in container`
///
/// # Errors
/// `TypeError` if the container does not support membership tests.
pub fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match container {
        Value::List(items) => Ok(items.borrow().iter().any(|v| equals(v, item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| equals(v, item))),
        Value::Dict(entries) => Ok(entries.borrow().contains_key(&Key::from_value(item)?)),
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(&**needle)),
            other => Err(type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Range { start, step, .. } => Ok(as_int(item)
            .and_then(|i| i.checked_sub(*start))
            .is_some_and(|offset| {
                offset % step == 0 && (0..range_len(container)).contains(&(offset / step))
            })),
        other => Err(type_error(format!("argument of type '{}' is not iterable", other.type_name()))),
    }
}

/// Resolve a possibly negative index against a sequence length
fn normalize(index: &Value, len: usize, what: &str) -> Result<Option<usize>, RuntimeError> {
    let Some(index) = as_int(index) else {
        return Err(type_error(format!(
            "{what} indices must be integers or slices, not {}",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 { index + len } else { index };
    Ok(if (0..len).contains(&resolved) { usize::try_from(resolved).ok() } else { None })
}

fn index_error(what: &str) -> RuntimeError {
    RuntimeError::new(ExcKind::IndexError, format!("{what} index out of range"))
}

fn key_error(key: &Value) -> RuntimeError {
    RuntimeError::new(ExcKind::KeyError, key.repr())
}

/// `container[index]`
///
/// # Errors
/// `IndexError`, `KeyError` or `TypeError` as Python would raise them.
pub fn get_item(container: &Value, index: &Value) -> OpResult {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let at = normalize(index, items.len(), "list")?.ok_or_else(|| index_error("list"))?;
            Ok(items[at].clone())
        }
        Value::Tuple(items) => {
            let at = normalize(index, items.len(), "tuple")?.ok_or_else(|| index_error("tuple"))?;
            Ok(items[at].clone())
        }
        Value::Str(text) => {
            let len = text.chars().count();
            let at = normalize(index, len, "string")?.ok_or_else(|| index_error("string"))?;
            Ok(text.chars().nth(at).map_or(Value::None, |c| Value::str(c.encode_utf8(&mut [0; 4]))))
        }
        Value::Dict(entries) => {
            let key = Key::from_value(index)?;
            entries.borrow().get(&key).cloned().ok_or_else(|| key_error(index))
        }
        Value::Range { start, step, .. } => {
            let len = usize::try_from(range_len(container)).unwrap_or(0);
            let at = normalize(index, len, "range")?.ok_or_else(|| index_error("range object"))?;
            let at = i64::try_from(at).map_err(|_| overflow())?;
            Ok(Value::Int(start + at * step))
        }
        other => Err(type_error(format!("'{}' object is not subscriptable", other.type_name()))),
    }
}

/// `container[index] = value`
///
/// # Errors
/// `IndexError`, `TypeError` for immutable or unsupported containers.
pub fn set_item(container: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let at = normalize(index, items.len(), "list")?
                .ok_or_else(|| RuntimeError::new(ExcKind::IndexError, "list assignment index out of range"))?;
            items[at] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = Key::from_value(index)?;
            entries.borrow_mut().insert(key, value);
            Ok(())
        }
        other => Err(type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// `del container[index]`
///
/// # Errors
/// `IndexError`, `KeyError`, `TypeError` as for assignment.
pub fn del_item(container: &Value, index: &Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let at = normalize(index, items.len(), "list")?
                .ok_or_else(|| RuntimeError::new(ExcKind::IndexError, "list assignment index out of range"))?;
            items.remove(at);
            Ok(())
        }
        Value::Dict(entries) => {
            let key = Key::from_value(index)?;
            entries.borrow_mut().shift_remove(&key).map(|_| ()).ok_or_else(|| key_error(index))
        }
        other => Err(type_error(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}
