//! # Shared Hook Vocabulary (Script Runtime ↔ Profiler)
//!
//! Defines the hook calls that the instrumenter weaves into a program tree and
//! that the script interpreter dispatches while running it. The interpreter
//! knows nothing about timing; it only forwards each hook to whatever
//! [`LineHooks`] implementation it was handed. The profiler's accumulator is
//! one such implementation, [`NoHooks`] is another.
//!
//! ## Hook Kinds
//!
//! 1. **Begin** / **End** - bracket one measurable statement (timed + counted)
//! 2. **Mark** - precede a control-transfer statement (counted only)
//!
//! When a bracketed statement raises, the interpreter calls
//! [`LineHooks::abandon`] in place of the `End` that never runs.
//!
//! ## Key Types
//!
//! - [`Hook`] - A hook call node carried by an instrumented tree
//! - [`HookKind`] - Which accumulator operation the hook invokes
//! - [`LineHooks`] - Receiver of hook calls during execution

// ============================================================================
// Constants
// ============================================================================

/// Source line number (1-based, as reported by the lexer)
pub type LineNo = u32;

/// Receiver name used when an instrumented tree is rendered back to source
///
/// Hook nodes unparse as `_lineprof.begin(12)`, `_lineprof.end(12)` and
/// `_lineprof.mark(12)`.
pub const HOOK_RECEIVER: &str = "_lineprof";

/// Default flush threshold in seconds
///
/// Accumulated per-line state is published as a snapshot once this much
/// wall-clock time has passed since the previous publish.
pub const DEFAULT_FLUSH_INTERVAL_SECS: f64 = 1.0;

// ============================================================================
// Hook Calls
// ============================================================================

/// Accumulator operation invoked by a hook call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Open a timing interval for the line (placed before a measurable statement)
    Begin,
    /// Close the timing interval and count one evaluation (placed after it)
    End,
    /// Count one evaluation without timing (placed before return/break/continue)
    Mark,
}

impl HookKind {
    /// Method name used when unparsing a hook node
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            HookKind::Begin => "begin",
            HookKind::End => "end",
            HookKind::Mark => "mark",
        }
    }
}

/// A hook call node, parameterized by the original statement's line number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hook {
    pub kind: HookKind,
    pub line: LineNo,
}

impl Hook {
    #[must_use]
    pub fn begin(line: LineNo) -> Self {
        Self { kind: HookKind::Begin, line }
    }

    #[must_use]
    pub fn end(line: LineNo) -> Self {
        Self { kind: HookKind::End, line }
    }

    #[must_use]
    pub fn mark(line: LineNo) -> Self {
        Self { kind: HookKind::Mark, line }
    }
}

impl core::fmt::Display for Hook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{HOOK_RECEIVER}.{}({})", self.kind.method(), self.line)
    }
}

// ============================================================================
// Hook Receivers
// ============================================================================

/// Receiver of hook calls, invoked synchronously by the running program
///
/// Implementations are owned by the execution context. Nothing else may call
/// them, which is what lets the profiler keep its per-line maps lock-free.
pub trait LineHooks {
    /// Statement on `line` is about to run
    fn begin(&mut self, line: LineNo);

    /// Statement on `line` completed normally
    fn end(&mut self, line: LineNo);

    /// Control is about to leave the block from `line`
    fn mark(&mut self, line: LineNo);

    /// Statement on `line` raised after its `begin`; no `end` will follow
    fn abandon(&mut self, _line: LineNo) {}

    /// Dispatch a hook node to the matching operation
    fn fire(&mut self, hook: Hook) {
        match hook.kind {
            HookKind::Begin => self.begin(hook.line),
            HookKind::End => self.end(hook.line),
            HookKind::Mark => self.mark(hook.line),
        }
    }
}

/// Hook receiver that ignores every call (plain, unprofiled execution)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl LineHooks for NoHooks {
    fn begin(&mut self, _line: LineNo) {}
    fn end(&mut self, _line: LineNo) {}
    fn mark(&mut self, _line: LineNo) {}
}

/// Hook receiver that records every call in order
///
/// Used by tests to assert on the exact hook sequence a program produces.
#[derive(Debug, Default, Clone)]
pub struct HookLog {
    pub calls: Vec<Hook>,
    /// Lines passed to `abandon`, in order
    pub abandoned: Vec<LineNo>,
}

impl LineHooks for HookLog {
    fn begin(&mut self, line: LineNo) {
        self.calls.push(Hook::begin(line));
    }

    fn end(&mut self, line: LineNo) {
        self.calls.push(Hook::end(line));
    }

    fn mark(&mut self, line: LineNo) {
        self.calls.push(Hook::mark(line));
    }

    fn abandon(&mut self, line: LineNo) {
        self.abandoned.push(line);
    }
}
