//! # lineprof-script
//!
//! The scripting language lineprof profiles: a Python-flavoured subset with
//! indentation-delimited blocks, functions with closures, simple classes,
//! exceptions and the usual containers.
//!
//! ## Pipeline
//!
//! ```text
//! source ──► lexer ──► parser ──► Program ──► (instrumenter) ──► Interpreter
//!                                    │                                │
//!                                    └──► unparse (debug dump)        └──► LineHooks
//! ```
//!
//! The instrumenter itself lives in the `lineprof` crate; this crate only
//! defines the hook statement node and executes it by forwarding to the
//! [`LineHooks`](lineprof_common::LineHooks) receiver given to the
//! [`Interpreter`].
//!
//! ## Unsupported
//!
//! Slices, keyword and default arguments, lambdas, comprehensions, class
//! inheritance, generators and string formatting are not part of the
//! language. Programs using them fail to parse.

pub mod ast;
pub mod error;
pub mod highlight;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod unparse;

pub use ast::{Block, Program, Stmt, StmtKind};
pub use error::{ExcKind, Exception, RuntimeError, ScriptError, SyntaxError};
pub use highlight::{keyword_spans, KeywordSpan};
pub use interp::{Interpreter, Value};
pub use parser::parse;
pub use unparse::unparse;
