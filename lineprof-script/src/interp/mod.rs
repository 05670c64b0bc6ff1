//! Tree-walking interpreter
//!
//! Executes a [`Program`] statement by statement. Hook statements woven in by
//! the instrumenter are forwarded to the [`LineHooks`] receiver the
//! interpreter was built with; they have no other effect on execution, so an
//! instrumented program produces the same output and the same exceptions as
//! the plain one.
//!
//! ## Scoping
//!
//! Module code reads and writes globals. Function code writes locals (unless
//! the name is declared `global`) and reads locals, then enclosing function
//! scopes, then globals, then builtins. Class bodies run in their own scope
//! whose bindings become the class attributes.
//!
//! ## Limits
//!
//! Calls nest at most `recursion_limit` deep before `RecursionError` is
//! raised. Every nested call costs native stack, so callers running deep
//! programs should use a thread with a generous stack.

mod builtins;
mod ops;
mod scope;
mod value;

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Write;
use std::mem;
use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;
use lineprof_common::{HookKind, LineHooks};
use log::{debug, warn};

use crate::ast::{BinOp, BoolOp, Constant, Expr, Handler, Program, Stmt, StmtKind};
use crate::error::{ExcKind, RuntimeError};

pub use builtins::Builtin;
pub use scope::Scope;
pub use value::{Class, Function, Instance, Key, Method, Module, NativeMethod, Value};

/// Default maximum call depth
pub const DEFAULT_RECURSION_LIMIT: usize = 1000;

type Eval = Result<Value, RuntimeError>;
type Exec = Result<Flow, RuntimeError>;

/// Process-facing services available to scripts
pub struct Host {
    out: Box<dyn Write>,
    /// Zero point for `time.monotonic()`
    pub(crate) epoch: Instant,
}

impl Host {
    #[must_use]
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out, epoch: Instant::now() }
    }

    pub(crate) fn print(&mut self, text: &str) -> Result<(), RuntimeError> {
        writeln!(self.out, "{text}")
            .map_err(|err| RuntimeError::new(ExcKind::RuntimeError, format!("cannot write output: {err}")))
    }
}

/// How a block finished
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Module,
    Function,
    Class,
}

struct Frame {
    kind: FrameKind,
    locals: Rc<Scope>,
    /// Names declared `global` in this frame
    globals: HashSet<String>,
}

impl Frame {
    fn new(kind: FrameKind, locals: Rc<Scope>) -> Self {
        Self { kind, locals, globals: HashSet::new() }
    }
}

/// Script interpreter dispatching hook statements to `H`
pub struct Interpreter<H: LineHooks> {
    hooks: H,
    host: Host,
    globals: Rc<Scope>,
    frame: Frame,
    depth: usize,
    recursion_limit: usize,
    /// Exceptions being handled by enclosing `except` clauses (for bare `raise`)
    handling: Vec<RuntimeError>,
}

impl<H: LineHooks> Interpreter<H> {
    /// Create an interpreter writing program output to `out`
    pub fn new(hooks: H, out: Box<dyn Write>) -> Self {
        let globals = Rc::new(Scope::new(None));
        Self {
            hooks,
            host: Host::new(out),
            frame: Frame::new(FrameKind::Module, globals.clone()),
            globals,
            depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            handling: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Give the hook receiver back once execution is over
    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Read a module-level variable
    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    /// Run a program to completion
    ///
    /// A `return` at module level ends the program normally.
    ///
    /// # Errors
    /// Returns the exception that escaped the program, tagged with the line
    /// of the innermost statement it passed through.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.frame = Frame::new(FrameKind::Module, self.globals.clone());
        self.depth = 0;
        self.handling.clear();
        let result = self.exec_block(&program.body);
        if let Err(e) = self.host.out.flush() {
            warn!("program output flush failed: {e}");
        }
        if let Err(err) = &result {
            debug!("uncaught {err}");
        }
        result.map(|_| ())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_block(&mut self, body: &[Stmt]) -> Exec {
        // line whose begin hook fired and whose end has not
        let mut open = None;
        for stmt in body {
            if let StmtKind::Hook(hook) = &stmt.kind {
                match hook.kind {
                    HookKind::Begin => open = Some(hook.line),
                    HookKind::End => open = None,
                    HookKind::Mark => {}
                }
            }
            match self.exec_stmt(stmt) {
                Ok(Flow::Normal) => {}
                Ok(flow) => return Ok(flow),
                Err(err) => {
                    if let Some(line) = open {
                        self.hooks.abandon(line);
                    }
                    return Err(err.locate(stmt.line));
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Exec {
        match &stmt.kind {
            StmtKind::Hook(hook) => self.hooks.fire(*hook),
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.aug_assign(target, *op, value)?,
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Import(aliases) => {
                for alias in aliases {
                    let module = import(&alias.name)?;
                    self.store(alias.bound_name(), Value::Module(module));
                }
            }
            StmtKind::ImportFrom { module, names } => {
                let source = import(module)?;
                for alias in names {
                    let value = source.attrs.get(alias.name.as_str()).cloned().ok_or_else(|| {
                        RuntimeError::new(
                            ExcKind::ImportError,
                            format!("cannot import name '{}' from '{module}'", alias.name),
                        )
                    })?;
                    self.store(alias.bound_name(), value);
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::If { test, body, orelse } => {
                let branch = if self.eval(test)?.is_truthy() { body } else { orelse };
                return self.exec_block(branch);
            }
            StmtKind::While { test, body, orelse } => return self.exec_while(test, body, orelse),
            StmtKind::For { target, iter, body, orelse } => {
                return self.exec_for(target, iter, body, orelse)
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                return self.exec_try(body, handlers, orelse, finalbody)
            }
            StmtKind::FunctionDef { name, params, body } => {
                let closure = match self.frame.kind {
                    FrameKind::Module => None,
                    FrameKind::Function => Some(self.frame.locals.clone()),
                    FrameKind::Class => self.frame.locals.parent(),
                };
                let function = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::from(body.as_slice()),
                    closure,
                };
                self.store(name, Value::Function(Rc::new(function)));
            }
            StmtKind::ClassDef { name, body } => self.exec_class(name, body)?,
            StmtKind::With { context, alias, body } => {
                return self.exec_with(context, alias.as_deref(), body)
            }
            StmtKind::Pass => {}
            StmtKind::Raise(exc) => return Err(self.raise(exc.as_ref())),
            StmtKind::Global(names) => {
                if self.frame.kind != FrameKind::Module {
                    self.frame.globals.extend(names.iter().cloned());
                }
            }
            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.is_truthy() {
                    let message = match msg {
                        Some(msg) => self.eval(msg)?.to_str(),
                        None => String::new(),
                    };
                    return Err(RuntimeError::new(ExcKind::AssertionError, message));
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_while(&mut self, test: &Expr, body: &[Stmt], orelse: &[Stmt]) -> Exec {
        while self.eval(test)?.is_truthy() {
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        self.exec_block(orelse)
    }

    fn exec_for(&mut self, target: &Expr, iter: &Expr, body: &[Stmt], orelse: &[Stmt]) -> Exec {
        let iterable = self.eval(iter)?;
        for item in value::iterate(&iterable)? {
            self.assign(target, item)?;
            match self.exec_block(body)? {
                Flow::Break => return Ok(Flow::Normal),
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        self.exec_block(orelse)
    }

    fn exec_try(&mut self, body: &[Stmt], handlers: &[Handler], orelse: &[Stmt], finalbody: &[Stmt]) -> Exec {
        let outcome = match self.exec_block(body) {
            Ok(Flow::Normal) => self.exec_block(orelse),
            Ok(flow) => Ok(flow),
            Err(err) => self.handle(err, handlers),
        };
        if finalbody.is_empty() {
            return outcome;
        }
        // A return/break/continue inside `finally` replaces the pending outcome
        match self.exec_block(finalbody)? {
            Flow::Normal => outcome,
            flow => Ok(flow),
        }
    }

    fn handle(&mut self, err: RuntimeError, handlers: &[Handler]) -> Exec {
        for handler in handlers {
            let matched = match &handler.kind {
                None => true,
                Some(filter) => {
                    let filter = self.eval(filter).map_err(|e| e.locate(handler.line))?;
                    exception_matches(&filter, err.kind()).map_err(|e| e.locate(handler.line))?
                }
            };
            if !matched {
                continue;
            }
            if let Some(name) = &handler.name {
                self.store(name, Value::Exception(Rc::new(err.exception.clone())));
            }
            self.handling.push(err);
            let result = self.exec_block(&handler.body);
            self.handling.pop();
            return result;
        }
        Err(err)
    }

    fn exec_class(&mut self, name: &str, body: &[Stmt]) -> Result<(), RuntimeError> {
        let parent = match self.frame.kind {
            FrameKind::Module => None,
            FrameKind::Function => Some(self.frame.locals.clone()),
            FrameKind::Class => self.frame.locals.parent(),
        };
        let locals = Rc::new(Scope::new(parent));
        let outer = mem::replace(&mut self.frame, Frame::new(FrameKind::Class, locals.clone()));
        let result = self.exec_block(body);
        self.frame = outer;
        result?;

        let class = Class { name: name.to_string(), attrs: RefCell::new(locals.take_vars()) };
        self.store(name, Value::Class(Rc::new(class)));
        Ok(())
    }

    fn exec_with(&mut self, context: &Expr, alias: Option<&str>, body: &[Stmt]) -> Exec {
        let manager = self.eval(context)?;
        let enter = Self::protocol_method(&manager, "__enter__")?;
        let exit = Self::protocol_method(&manager, "__exit__")?;

        let entered = self.call(enter, Vec::new())?;
        if let Some(alias) = alias {
            self.store(alias, entered);
        }
        match self.exec_block(body) {
            Ok(flow) => {
                self.call(exit, vec![Value::None, Value::None, Value::None])?;
                Ok(flow)
            }
            Err(err) => {
                let args = vec![
                    Value::ExceptionType(err.kind()),
                    Value::Exception(Rc::new(err.exception.clone())),
                    Value::None,
                ];
                if self.call(exit, args)?.is_truthy() {
                    Ok(Flow::Normal)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn protocol_method(manager: &Value, name: &str) -> Eval {
        let found = match manager {
            Value::Instance(_) => Self::get_attr(manager, name).ok(),
            _ => None,
        };
        found.ok_or_else(|| {
            RuntimeError::new(
                ExcKind::TypeError,
                format!(
                    "'{}' object does not support the context manager protocol",
                    manager.type_name()
                ),
            )
        })
    }

    /// Exception raised by a `raise` statement
    fn raise(&mut self, exc: Option<&Expr>) -> RuntimeError {
        let Some(expr) = exc else {
            return self.handling.last().cloned().unwrap_or_else(|| {
                RuntimeError::new(ExcKind::RuntimeError, "No active exception to reraise")
            });
        };
        match self.eval(expr) {
            Ok(Value::ExceptionType(kind)) => RuntimeError::new(kind, ""),
            Ok(Value::Exception(exc)) => RuntimeError::from_exception((*exc).clone()),
            Ok(_) => RuntimeError::new(ExcKind::TypeError, "exceptions must derive from BaseException"),
            Err(err) => err,
        }
    }

    // ------------------------------------------------------------------
    // Names and targets
    // ------------------------------------------------------------------

    fn store(&mut self, name: &str, value: Value) {
        if self.frame.globals.contains(name) {
            self.globals.set(name, value);
        } else {
            self.frame.locals.set(name, value);
        }
    }

    fn load(&self, name: &str) -> Eval {
        let local = if self.frame.globals.contains(name) { None } else { self.frame.locals.get(name) };
        local
            .or_else(|| self.globals.get(name))
            .or_else(|| builtins::lookup(name))
            .ok_or_else(|| RuntimeError::new(ExcKind::NameError, format!("name '{name}' is not defined")))
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => {
                self.store(name, value);
                Ok(())
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                let values: Vec<Value> = value::iterate(&value)?.collect();
                if values.len() < targets.len() {
                    return Err(RuntimeError::new(
                        ExcKind::ValueError,
                        format!(
                            "not enough values to unpack (expected {}, got {})",
                            targets.len(),
                            values.len()
                        ),
                    ));
                }
                if values.len() > targets.len() {
                    return Err(RuntimeError::new(
                        ExcKind::ValueError,
                        format!("too many values to unpack (expected {})", targets.len()),
                    ));
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value)?;
                }
                Ok(())
            }
            Expr::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                set_attr(&object, attr, value)
            }
            Expr::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                ops::set_item(&container, &index, value)
            }
            _ => Err(RuntimeError::new(ExcKind::TypeError, "cannot assign to expression")),
        }
    }

    fn aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => {
                let current = self.load(name)?;
                let rhs = self.eval(value)?;
                let updated = inplace(op, current, &rhs)?;
                self.store(name, updated);
            }
            Expr::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                let current = Self::get_attr(&object, attr)?;
                let rhs = self.eval(value)?;
                set_attr(&object, attr, inplace(op, current, &rhs)?)?;
            }
            Expr::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                let current = ops::get_item(&container, &index)?;
                let rhs = self.eval(value)?;
                ops::set_item(&container, &index, inplace(op, current, &rhs)?)?;
            }
            _ => {
                return Err(RuntimeError::new(
                    ExcKind::TypeError,
                    "illegal expression for augmented assignment",
                ))
            }
        }
        Ok(())
    }

    fn delete(&mut self, target: &Expr) -> Result<(), RuntimeError> {
        match target {
            Expr::Name(name) => {
                let removed = if self.frame.globals.contains(name) {
                    self.globals.remove(name)
                } else {
                    self.frame.locals.remove(name)
                };
                removed.map(|_| ()).ok_or_else(|| {
                    RuntimeError::new(ExcKind::NameError, format!("name '{name}' is not defined"))
                })
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(())
            }
            Expr::Subscript { value: container, index } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                ops::del_item(&container, &index)
            }
            Expr::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                let removed = match &object {
                    Value::Instance(instance) => instance.attrs.borrow_mut().remove(attr.as_str()),
                    Value::Class(class) => class.attrs.borrow_mut().remove(attr.as_str()),
                    _ => None,
                };
                removed.map(|_| ()).ok_or_else(|| missing_attr(&object, attr))
            }
            _ => Err(RuntimeError::new(ExcKind::TypeError, "cannot delete expression")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Eval {
        match expr {
            Expr::Const(constant) => Ok(match constant {
                Constant::None => Value::None,
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Int(i) => Value::Int(*i),
                Constant::Float(f) => Value::Float(*f),
                Constant::Str(s) => Value::str(s),
            }),
            Expr::Name(name) => self.load(name),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Tuple(items) => Ok(Value::Tuple(Rc::from(self.eval_all(items)?))),
            Expr::Dict(entries) => {
                let mut dict = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = Key::from_value(&self.eval(key)?)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value);
                }
                Ok(Value::Dict(Rc::new(RefCell::new(dict))))
            }
            Expr::BinOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    BoolOp::And => !left.is_truthy(),
                    BoolOp::Or => left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Compare { left, ops: links } => {
                let mut left = self.eval(left)?;
                for (op, right) in links {
                    let right = self.eval(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Call { func, args } => {
                let callee = self.eval(func)?;
                let args = self.eval_all(args)?;
                self.call(callee, args)
            }
            Expr::Attribute { value, attr } => {
                let value = self.eval(value)?;
                Self::get_attr(&value, attr)
            }
            Expr::Subscript { value, index } => {
                let value = self.eval(value)?;
                let index = self.eval(index)?;
                ops::get_item(&value, &index)
            }
            Expr::IfExp { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn get_attr(object: &Value, attr: &str) -> Eval {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.attrs.borrow().get(attr) {
                    return Ok(value.clone());
                }
                match instance.class.attrs.borrow().get(attr) {
                    Some(Value::Function(function)) => Ok(Value::Method(Rc::new(Method {
                        receiver: object.clone(),
                        function: function.clone(),
                    }))),
                    Some(value) => Ok(value.clone()),
                    None => Err(missing_attr(object, attr)),
                }
            }
            Value::Class(class) => {
                class.attrs.borrow().get(attr).cloned().ok_or_else(|| missing_attr(object, attr))
            }
            Value::Module(module) => {
                module.attrs.get(attr).cloned().ok_or_else(|| missing_attr(object, attr))
            }
            Value::Exception(exc) if attr == "args" => {
                let args = if exc.message.is_empty() { Vec::new() } else { vec![Value::str(&exc.message)] };
                Ok(Value::Tuple(Rc::from(args)))
            }
            _ => builtins::native_method(object, attr).ok_or_else(|| missing_attr(object, attr)),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn call(&mut self, callee: Value, args: Vec<Value>) -> Eval {
        match callee {
            Value::Function(function) => self.call_function(&function, args),
            Value::Method(method) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(method.receiver.clone());
                full.extend(args);
                self.call_function(&method.function, full)
            }
            Value::Builtin(builtin) => builtins::call(&mut self.host, builtin, args),
            Value::NativeMethod(method) => builtins::call_method(&method.receiver, method.name, args),
            Value::Class(class) => self.instantiate(&class, args),
            Value::ExceptionType(kind) => {
                Ok(Value::Exception(Rc::new(builtins::new_exception(kind, &args))))
            }
            other => Err(RuntimeError::new(
                ExcKind::TypeError,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(&mut self, function: &Function, args: Vec<Value>) -> Eval {
        if args.len() != function.params.len() {
            return Err(RuntimeError::new(
                ExcKind::TypeError,
                format!(
                    "{}() takes {} positional arguments but {} were given",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
            ));
        }
        if self.depth >= self.recursion_limit {
            return Err(RuntimeError::new(ExcKind::RecursionError, "maximum recursion depth exceeded"));
        }

        let locals = Rc::new(Scope::new(function.closure.clone()));
        for (param, arg) in function.params.iter().zip(args) {
            locals.set(param, arg);
        }
        let caller = mem::replace(&mut self.frame, Frame::new(FrameKind::Function, locals));
        self.depth += 1;
        let result = self.exec_block(&function.body);
        self.depth -= 1;
        self.frame = caller;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::None),
        }
    }

    fn instantiate(&mut self, class: &Rc<Class>, args: Vec<Value>) -> Eval {
        let instance = Value::Instance(Rc::new(Instance { class: class.clone(), attrs: RefCell::default() }));
        let init = class.attrs.borrow().get("__init__").cloned();
        match init {
            Some(Value::Function(init)) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(instance.clone());
                full.extend(args);
                let returned = self.call_function(&init, full)?;
                if !matches!(returned, Value::None) {
                    return Err(RuntimeError::new(
                        ExcKind::TypeError,
                        format!("__init__() should return None, not '{}'", returned.type_name()),
                    ));
                }
            }
            Some(other) => {
                self.call(other, args)?;
            }
            None if !args.is_empty() => {
                return Err(RuntimeError::new(
                    ExcKind::TypeError,
                    format!("{}() takes no arguments", class.name),
                ));
            }
            None => {}
        }
        Ok(instance)
    }
}

fn import(name: &str) -> Result<Rc<Module>, RuntimeError> {
    builtins::import(name)
        .map(Rc::new)
        .ok_or_else(|| RuntimeError::new(ExcKind::ImportError, format!("No module named '{name}'")))
}

/// `op=` semantics: lists extend in place, everything else rebinds
fn inplace(op: BinOp, current: Value, rhs: &Value) -> Eval {
    if let (BinOp::Add, Value::List(items)) = (op, &current) {
        let extra: Vec<Value> = value::iterate(rhs)?.collect();
        items.borrow_mut().extend(extra);
        return Ok(current);
    }
    ops::binary(op, &current, rhs)
}

fn set_attr(object: &Value, attr: &str, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::Instance(instance) => {
            instance.attrs.borrow_mut().insert(attr.to_string(), value);
            Ok(())
        }
        Value::Class(class) => {
            class.attrs.borrow_mut().insert(attr.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::new(
            ExcKind::AttributeError,
            format!("'{}' object attribute '{attr}' is read-only", other.type_name()),
        )),
    }
}

fn missing_attr(object: &Value, attr: &str) -> RuntimeError {
    let message = match object {
        Value::Module(module) => format!("module '{}' has no attribute '{attr}'", module.name),
        Value::Class(class) => format!("type object '{}' has no attribute '{attr}'", class.name),
        other => format!("'{}' object has no attribute '{attr}'", other.type_name()),
    };
    RuntimeError::new(ExcKind::AttributeError, message)
}

fn exception_matches(filter: &Value, kind: ExcKind) -> Result<bool, RuntimeError> {
    match filter {
        Value::ExceptionType(expected) => Ok(kind.is_subclass_of(*expected)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if exception_matches(option, kind)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(RuntimeError::new(
            ExcKind::TypeError,
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use lineprof_common::{Hook, HookLog, NoHooks};
    use std::io;

    /// Output sink shared with the test after the interpreter takes ownership
    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run(source: &str) -> (String, Result<(), RuntimeError>) {
        let program = parse(source).unwrap();
        let out = Captured::default();
        let mut interp = Interpreter::new(NoHooks, Box::new(out.clone()));
        let result = interp.run(&program);
        let text = String::from_utf8(out.0.borrow().clone()).unwrap();
        (text, result)
    }

    fn output(source: &str) -> String {
        let (text, result) = run(source);
        result.unwrap();
        text
    }

    #[test]
    fn test_huge_repeat_is_catchable() {
        let source = "\
try:
    x = [0] * 1000000000000000
except OverflowError as e:
    print('caught', e)
y = 'ab' * 4611686018427387904
";
        let (text, result) = run(source);
        assert_eq!(text, "caught repeated sequence is too long\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ExcKind::OverflowError);
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_print_and_arithmetic() {
        assert_eq!(output("x = 7\nprint(x // 2, x / 2, x % 3, 2 ** 10)\n"), "3 3.5 1 1024\n");
    }

    #[test]
    fn test_functions_and_recursion() {
        let src = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nprint(fib(15))\n";
        assert_eq!(output(src), "610\n");
    }

    #[test]
    fn test_closures_see_enclosing_scope() {
        let src = "def outer():\n    base = 10\n    def inner(x):\n        return base + x\n    base = 20\n    return inner(1)\nprint(outer())\n";
        assert_eq!(output(src), "21\n");
    }

    #[test]
    fn test_global_declaration() {
        let src = "count = 0\ndef bump():\n    global count\n    count += 1\nbump()\nbump()\nprint(count)\n";
        assert_eq!(output(src), "2\n");
    }

    #[test]
    fn test_loops_with_break_continue_else() {
        let src = "\
total = 0
for i in range(10):
    if i % 2 == 0:
        continue
    if i > 7:
        break
    total += i
else:
    total = -1
print(total)
n = 0
while n < 3:
    n += 1
else:
    print('done', n)
";
        assert_eq!(output(src), "16\ndone 3\n");
    }

    #[test]
    fn test_try_except_else_finally() {
        let src = "\
def f(x):
    try:
        r = 10 // x
    except ZeroDivisionError as e:
        print('caught', e)
        return -1
    else:
        return r
    finally:
        print('finally', x)
print(f(2))
print(f(0))
";
        assert_eq!(output(src), "finally 2\n5\ncaught integer division or modulo by zero\nfinally 0\n-1\n");
    }

    #[test]
    fn test_finally_return_overrides() {
        let src = "def f():\n    try:\n        return 1\n    finally:\n        return 2\nprint(f())\n";
        assert_eq!(output(src), "2\n");
    }

    #[test]
    fn test_exception_hierarchy_and_bare_raise() {
        let src = "\
try:
    try:
        {}['missing']
    except LookupError:
        print('lookup')
        raise
except KeyError as e:
    print('outer', e)
";
        assert_eq!(output(src), "lookup\nouter 'missing'\n");
    }

    #[test]
    fn test_uncaught_exception_carries_line() {
        let (text, result) = run("print('before')\nx = 1\ny = x / 0\nprint('after')\n");
        assert_eq!(text, "before\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ExcKind::ZeroDivisionError);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_error_line_is_innermost_statement() {
        let (_, result) = run("def f():\n    return undefined_name\nf()\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ExcKind::NameError);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_classes_and_methods() {
        let src = "\
class Counter:
    start = 5
    def __init__(self, step):
        self.value = Counter.start
        self.step = step
    def tick(self):
        self.value += self.step
        return self.value
c = Counter(2)
c.tick()
print(c.tick(), c.start)
";
        assert_eq!(output(src), "9 5\n");
    }

    #[test]
    fn test_with_statement_calls_protocol() {
        let src = "\
class Guard:
    def __enter__(self):
        print('enter')
        return 42
    def __exit__(self, kind, exc, tb):
        print('exit', kind is None)
        return True
with Guard() as value:
    print(value)
    raise ValueError('suppressed')
print('after')
";
        assert_eq!(output(src), "enter\n42\nexit False\nafter\n");
    }

    #[test]
    fn test_containers_alias() {
        let src = "a = [1, 2]\nb = a\nb.append(3)\nb += [4]\nd = {'k': a}\nprint(a, len(d['k']), d)\n";
        assert_eq!(output(src), "[1, 2, 3, 4] 4 {'k': [1, 2, 3, 4]}\n");
    }

    #[test]
    fn test_tuple_unpacking() {
        assert_eq!(output("a, b = 1, 2\na, b = b, a\nprint(a, b)\n"), "2 1\n");
        let (_, result) = run("a, b = [1]\n");
        assert_eq!(result.unwrap_err().kind(), ExcKind::ValueError);
    }

    #[test]
    fn test_imports() {
        let src = "import math\nfrom time import monotonic as now\nprint(math.floor(2.7), now() >= 0)\n";
        assert_eq!(output(src), "2 True\n");
        let (_, result) = run("import os\n");
        assert_eq!(result.unwrap_err().kind(), ExcKind::ImportError);
    }

    #[test]
    fn test_module_level_return_stops_program() {
        assert_eq!(output("print(1)\nreturn\nprint(2)\n"), "1\n");
    }

    #[test]
    fn test_recursion_limit() {
        let program = parse("def f(n):\n    return f(n + 1)\nf(0)\n").unwrap();
        let mut interp = Interpreter::new(NoHooks, Box::new(io::sink())).with_recursion_limit(30);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.kind(), ExcKind::RecursionError);
    }

    #[test]
    fn test_assert_failure() {
        let (_, result) = run("assert 1 == 2, 'math is broken'\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ExcKind::AssertionError);
        assert_eq!(err.exception.message, "math is broken");
    }

    #[test]
    fn test_hooks_are_dispatched_in_order() {
        let program = Program {
            body: vec![
                Stmt::hook(Hook::begin(1)),
                Stmt::new(1, StmtKind::Pass),
                Stmt::hook(Hook::end(1)),
                Stmt::hook(Hook::mark(2)),
                Stmt::new(2, StmtKind::Return(None)),
                Stmt::hook(Hook::begin(3)),
            ],
        };
        let mut interp = Interpreter::new(HookLog::default(), Box::new(io::sink()));
        interp.run(&program).unwrap();
        let log = interp.into_hooks();
        assert_eq!(log.calls, vec![Hook::begin(1), Hook::end(1), Hook::mark(2)]);
    }

    #[test]
    fn test_chained_comparison_and_bool_ops() {
        assert_eq!(output("x = 5\nprint(1 < x <= 5, 0 or 'dflt', 3 and 4, not x)\n"), "True dflt 4 False\n");
    }
}
