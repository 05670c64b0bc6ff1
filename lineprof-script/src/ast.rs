//! Syntax tree for lineprof scripts
//!
//! Statements carry the line number of their first token. Expressions carry
//! no position: runtime errors are reported against the enclosing statement.

use lineprof_common::{Hook, LineNo};

/// An ordered sequence of statements (a suite)
pub type Block = Vec<Stmt>;

/// A parsed module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: LineNo,
    pub kind: StmtKind,
}

impl Stmt {
    #[must_use]
    pub fn new(line: LineNo, kind: StmtKind) -> Self {
        Self { line, kind }
    }

    /// Hook call statement (only produced by instrumentation)
    #[must_use]
    pub fn hook(hook: Hook) -> Self {
        Self { line: hook.line, kind: StmtKind::Hook(hook) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Bare expression evaluated for its side effects
    Expr(Expr),
    /// `a = b = value`
    Assign { targets: Vec<Expr>, value: Expr },
    /// `target op= value`
    AugAssign { target: Expr, op: BinOp, value: Expr },
    /// `del a, b[0]`
    Delete(Vec<Expr>),
    /// `import time, math as m`
    Import(Vec<Alias>),
    /// `from time import sleep as nap`
    ImportFrom { module: String, names: Vec<Alias> },
    Return(Option<Expr>),
    Break,
    Continue,
    /// `elif` chains nest as a single `If` in `orelse`
    If { test: Expr, body: Block, orelse: Block },
    While { test: Expr, body: Block, orelse: Block },
    For { target: Expr, iter: Expr, body: Block, orelse: Block },
    Try { body: Block, handlers: Vec<Handler>, orelse: Block, finalbody: Block },
    FunctionDef { name: String, params: Vec<String>, body: Block },
    ClassDef { name: String, body: Block },
    /// `with context as alias:`
    With { context: Expr, alias: Option<String>, body: Block },
    Pass,
    Raise(Option<Expr>),
    Global(Vec<String>),
    Assert { test: Expr, msg: Option<Expr> },
    /// Hook call woven in by the instrumenter
    Hook(Hook),
}

impl StmtKind {
    /// Short statement kind name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Expr(_) => "expression",
            StmtKind::Assign { .. } => "assign",
            StmtKind::AugAssign { .. } => "augmented assign",
            StmtKind::Delete(_) => "del",
            StmtKind::Import(_) => "import",
            StmtKind::ImportFrom { .. } => "from-import",
            StmtKind::Return(_) => "return",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::For { .. } => "for",
            StmtKind::Try { .. } => "try",
            StmtKind::FunctionDef { .. } => "def",
            StmtKind::ClassDef { .. } => "class",
            StmtKind::With { .. } => "with",
            StmtKind::Pass => "pass",
            StmtKind::Raise(_) => "raise",
            StmtKind::Global(_) => "global",
            StmtKind::Assert { .. } => "assert",
            StmtKind::Hook(_) => "hook",
        }
    }
}

/// One `except` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub line: LineNo,
    /// Exception type (or tuple of types); `None` for a bare `except:`
    pub kind: Option<Expr>,
    pub name: Option<String>,
    pub body: Block,
}

/// `name as asname` in an import
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

impl Alias {
    /// Name the import binds in the current scope
    #[must_use]
    pub fn bound_name(&self) -> &str {
        self.asname.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Constant),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    BinOp { left: Box<Expr>, op: BinOp, right: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    BoolOp { op: BoolOp, left: Box<Expr>, right: Box<Expr> },
    /// Chained comparison `a < b <= c`
    Compare { left: Box<Expr>, ops: Vec<(CmpOp, Expr)> },
    Call { func: Box<Expr>, args: Vec<Expr> },
    Attribute { value: Box<Expr>, attr: String },
    Subscript { value: Box<Expr>, index: Box<Expr> },
    /// `body if test else orelse`
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr> },
}

impl Expr {
    /// Whether the expression may appear on the left of `=`
    #[must_use]
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple(items) | Expr::List(items) => items.iter().all(Expr::is_assignable),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}
