//! # Instrumenter
//!
//! Rewrites a parsed program into an equivalent program with hook statements
//! woven around the statements that can be measured.
//!
//! ## Rewrite Rules
//!
//! | Statement | Result |
//! |-----------|--------|
//! | expression, assign, augmented assign, `del`, `import`, `from ... import` | `begin(L)`, stmt, `end(L)` |
//! | `return`, `break`, `continue` | `mark(L)`, stmt |
//! | `if`, `while`, `for` | stmt, with body and `else` rewritten |
//! | `try` | stmt, with body, handlers, `else` and `finally` rewritten |
//! | `def`, `class`, `with` | stmt, with body rewritten |
//! | `pass`, `raise`, `global`, `assert` | unchanged, reported as skipped |
//!
//! `L` is always the line of the original statement. Statements keep their
//! relative order, so scoping, exception propagation and evaluation order
//! are those of the original program. A statement that raises never reaches
//! its `end` hook.
//!
//! Blocks are rewritten from an explicit work list, not by recursion, so
//! nesting depth is bounded by memory rather than by the native stack.

use lineprof_common::{Hook, LineNo};
use lineprof_script::{Program, Stmt, StmtKind};
use log::warn;

/// Result of instrumenting a program
#[derive(Debug, Clone)]
pub struct Instrumented {
    pub program: Program,
    /// Statements left without hooks, in line order
    pub skipped: Vec<Skipped>,
}

/// A statement the instrumenter has no rule for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skipped {
    pub line: LineNo,
    pub kind: &'static str,
}

/// How one statement is rewritten in its enclosing block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Surround with `begin`/`end`
    Bracket,
    /// Precede with `mark`
    Mark,
    /// Keep as is; its nested blocks are rewritten separately
    Descend,
    /// Keep as is and report
    Skip,
    /// Already a hook
    Keep,
}

fn rule(kind: &StmtKind) -> Rule {
    match kind {
        StmtKind::Expr(_)
        | StmtKind::Assign { .. }
        | StmtKind::AugAssign { .. }
        | StmtKind::Delete(_)
        | StmtKind::Import(_)
        | StmtKind::ImportFrom { .. } => Rule::Bracket,
        StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue => Rule::Mark,
        StmtKind::If { .. }
        | StmtKind::While { .. }
        | StmtKind::For { .. }
        | StmtKind::Try { .. }
        | StmtKind::FunctionDef { .. }
        | StmtKind::ClassDef { .. }
        | StmtKind::With { .. } => Rule::Descend,
        StmtKind::Pass | StmtKind::Raise(_) | StmtKind::Global(_) | StmtKind::Assert { .. } => {
            Rule::Skip
        }
        StmtKind::Hook(_) => Rule::Keep,
    }
}

/// Weave hook statements into a program
#[must_use]
pub fn instrument(mut program: Program) -> Instrumented {
    let mut skipped = Vec::new();
    let mut work: Vec<&mut Vec<Stmt>> = vec![&mut program.body];

    while let Some(block) = work.pop() {
        let original = std::mem::take(block);
        let mut rewritten = Vec::with_capacity(original.len() * 3);

        for stmt in original {
            let line = stmt.line;
            match rule(&stmt.kind) {
                Rule::Bracket => {
                    rewritten.push(Stmt::hook(Hook::begin(line)));
                    rewritten.push(stmt);
                    rewritten.push(Stmt::hook(Hook::end(line)));
                }
                Rule::Mark => {
                    rewritten.push(Stmt::hook(Hook::mark(line)));
                    rewritten.push(stmt);
                }
                Rule::Skip => {
                    let kind = stmt.kind.name();
                    warn!("line {line}: '{kind}' statement left uninstrumented");
                    skipped.push(Skipped { line, kind });
                    rewritten.push(stmt);
                }
                Rule::Descend | Rule::Keep => rewritten.push(stmt),
            }
        }
        *block = rewritten;

        for stmt in block {
            match &mut stmt.kind {
                StmtKind::If { body, orelse, .. }
                | StmtKind::While { body, orelse, .. }
                | StmtKind::For { body, orelse, .. } => {
                    work.push(body);
                    work.push(orelse);
                }
                StmtKind::Try { body, handlers, orelse, finalbody } => {
                    work.push(body);
                    work.extend(handlers.iter_mut().map(|handler| &mut handler.body));
                    work.push(orelse);
                    work.push(finalbody);
                }
                StmtKind::FunctionDef { body, .. }
                | StmtKind::ClassDef { body, .. }
                | StmtKind::With { body, .. } => work.push(body),
                _ => {}
            }
        }
    }

    skipped.sort_by_key(|s| s.line);
    Instrumented { program, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineprof_script::{parse, unparse};

    fn dump(source: &str) -> String {
        unparse(&instrument(parse(source).unwrap()).program.body)
    }

    #[test]
    fn test_measurable_statements_are_bracketed() {
        assert_eq!(
            dump("x = 1\nprint(x)\n"),
            "_lineprof.begin(1)\nx = 1\n_lineprof.end(1)\n\
             _lineprof.begin(2)\nprint(x)\n_lineprof.end(2)\n"
        );
    }

    #[test]
    fn test_control_transfer_gets_mark_only() {
        let out = dump("def f():\n    return 1\n");
        assert_eq!(out, "def f():\n    _lineprof.mark(2)\n    return 1\n");
    }

    #[test]
    fn test_nested_blocks_are_rewritten() {
        let src = "\
for i in range(3):
    if i:
        y = i
    else:
        continue
else:
    z = 0
";
        let expected = "\
for i in range(3):
    if i:
        _lineprof.begin(3)
        y = i
        _lineprof.end(3)
    else:
        _lineprof.mark(5)
        continue
else:
    _lineprof.begin(7)
    z = 0
    _lineprof.end(7)
";
        assert_eq!(dump(src), expected);
    }

    #[test]
    fn test_try_clauses_are_all_rewritten() {
        let src = "\
try:
    a = 1
except ValueError:
    b = 2
except:
    c = 3
else:
    d = 4
finally:
    e = 5
";
        let out = dump(src);
        for line in 2..=10 {
            if line % 2 == 0 {
                assert!(out.contains(&format!("_lineprof.begin({line})")), "line {line}:\n{out}");
                assert!(out.contains(&format!("_lineprof.end({line})")), "line {line}:\n{out}");
            }
        }
    }

    #[test]
    fn test_def_class_with_bodies_only() {
        let src = "\
class A:
    x = 1
    def m(self):
        with self as s:
            s.y = 2
";
        let out = dump(src);
        assert!(out.starts_with("class A:\n    _lineprof.begin(2)"));
        assert!(!out.contains("begin(1)"));
        assert!(!out.contains("begin(3)"));
        assert!(!out.contains("begin(4)"));
        assert!(out.contains("_lineprof.begin(5)"));
    }

    #[test]
    fn test_unsupported_statements_are_reported() {
        let result = instrument(parse("def f():\n    global g\n    pass\nassert True\nraise ValueError\n").unwrap());
        let found: Vec<_> = result.skipped.iter().map(|s| (s.line, s.kind)).collect();
        assert_eq!(found, vec![(2, "global"), (3, "pass"), (4, "assert"), (5, "raise")]);
        let out = unparse(&result.program.body);
        assert!(!out.contains("_lineprof"));
    }

    #[test]
    fn test_original_statements_keep_order_and_lines() {
        let program = parse("a = 1\nif a:\n    b = 2\nc = 3\n").unwrap();
        let original = program.clone();
        let result = instrument(program);
        let plain: Vec<_> = result
            .program
            .body
            .iter()
            .filter(|s| !matches!(s.kind, StmtKind::Hook(_)))
            .map(|s| s.line)
            .collect();
        assert_eq!(plain, original.body.iter().map(|s| s.line).collect::<Vec<_>>());
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let mut body = vec![Stmt::new(1_001, StmtKind::Break)];
        for line in (1..=1_000).rev() {
            body = vec![Stmt::new(
                line,
                StmtKind::While {
                    test: lineprof_script::ast::Expr::Name("x".into()),
                    body,
                    orelse: Vec::new(),
                },
            )];
        }
        let result = instrument(Program { body });

        let mut block = &result.program.body;
        for _ in 0..1_000 {
            match &block[0].kind {
                StmtKind::While { body, .. } => block = body,
                other => panic!("unexpected {}", other.name()),
            }
        }
        assert!(matches!(block[0].kind, StmtKind::Hook(hook) if hook == Hook::mark(1_001)));
    }
}
