//! Render a syntax tree back to source text
//!
//! Output is normalized (four-space indentation, composite sub-expressions
//! parenthesized) rather than a byte-exact copy of the input. Hook nodes
//! render as calls on the `_lineprof` receiver, which makes the debug dump of
//! an instrumented program read like the program that actually runs.

use crate::ast::{Block, BoolOp, Constant, Expr, Handler, Stmt, StmtKind, UnaryOp};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Render a block of statements as source text
#[must_use]
pub fn unparse(body: &[Stmt]) -> String {
    let mut out = String::new();
    write_block(&mut out, body, 0);
    out
}

/// Render a single expression
#[must_use]
pub fn unparse_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_block(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        line(out, depth, "pass");
        return;
    }
    for stmt in body {
        write_stmt(out, stmt, depth);
    }
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

fn write_else(out: &mut String, orelse: &Block, depth: usize) {
    if !orelse.is_empty() {
        line(out, depth, "else:");
        write_block(out, orelse, depth + 1);
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match &stmt.kind {
        StmtKind::Expr(expr) => line(out, depth, &unparse_expr(expr)),
        StmtKind::Assign { targets, value } => {
            let mut text = String::new();
            for target in targets {
                write_expr(&mut text, target);
                text.push_str(" = ");
            }
            write_expr(&mut text, value);
            line(out, depth, &text);
        }
        StmtKind::AugAssign { target, op, value } => {
            let text = format!("{} {}= {}", unparse_expr(target), op.symbol(), unparse_expr(value));
            line(out, depth, &text);
        }
        StmtKind::Delete(targets) => {
            let names: Vec<_> = targets.iter().map(unparse_expr).collect();
            line(out, depth, &format!("del {}", names.join(", ")));
        }
        StmtKind::Import(names) => {
            let names: Vec<_> = names.iter().map(alias_text).collect();
            line(out, depth, &format!("import {}", names.join(", ")));
        }
        StmtKind::ImportFrom { module, names } => {
            let names: Vec<_> = names.iter().map(alias_text).collect();
            line(out, depth, &format!("from {module} import {}", names.join(", ")));
        }
        StmtKind::Return(None) => line(out, depth, "return"),
        StmtKind::Return(Some(value)) => line(out, depth, &format!("return {}", unparse_expr(value))),
        StmtKind::Break => line(out, depth, "break"),
        StmtKind::Continue => line(out, depth, "continue"),
        StmtKind::If { test, body, orelse } => {
            line(out, depth, &format!("if {}:", unparse_expr(test)));
            write_block(out, body, depth + 1);
            write_else(out, orelse, depth);
        }
        StmtKind::While { test, body, orelse } => {
            line(out, depth, &format!("while {}:", unparse_expr(test)));
            write_block(out, body, depth + 1);
            write_else(out, orelse, depth);
        }
        StmtKind::For { target, iter, body, orelse } => {
            line(out, depth, &format!("for {} in {}:", unparse_expr(target), unparse_expr(iter)));
            write_block(out, body, depth + 1);
            write_else(out, orelse, depth);
        }
        StmtKind::Try { body, handlers, orelse, finalbody } => {
            line(out, depth, "try:");
            write_block(out, body, depth + 1);
            for handler in handlers {
                write_handler(out, handler, depth);
            }
            write_else(out, orelse, depth);
            if !finalbody.is_empty() {
                line(out, depth, "finally:");
                write_block(out, finalbody, depth + 1);
            }
        }
        StmtKind::FunctionDef { name, params, body } => {
            line(out, depth, &format!("def {name}({}):", params.join(", ")));
            write_block(out, body, depth + 1);
        }
        StmtKind::ClassDef { name, body } => {
            line(out, depth, &format!("class {name}:"));
            write_block(out, body, depth + 1);
        }
        StmtKind::With { context, alias, body } => {
            let header = match alias {
                Some(alias) => format!("with {} as {alias}:", unparse_expr(context)),
                None => format!("with {}:", unparse_expr(context)),
            };
            line(out, depth, &header);
            write_block(out, body, depth + 1);
        }
        StmtKind::Pass => line(out, depth, "pass"),
        StmtKind::Raise(None) => line(out, depth, "raise"),
        StmtKind::Raise(Some(exc)) => line(out, depth, &format!("raise {}", unparse_expr(exc))),
        StmtKind::Global(names) => line(out, depth, &format!("global {}", names.join(", "))),
        StmtKind::Assert { test, msg } => {
            let mut text = format!("assert {}", unparse_expr(test));
            if let Some(msg) = msg {
                let _ = write!(text, ", {}", unparse_expr(msg));
            }
            line(out, depth, &text);
        }
        StmtKind::Hook(hook) => line(out, depth, &hook.to_string()),
    }
}

fn write_handler(out: &mut String, handler: &Handler, depth: usize) {
    let header = match (&handler.kind, &handler.name) {
        (None, _) => "except:".to_string(),
        (Some(kind), None) => format!("except {}:", unparse_expr(kind)),
        (Some(kind), Some(name)) => format!("except {} as {name}:", unparse_expr(kind)),
    };
    line(out, depth, &header);
    write_block(out, &handler.body, depth + 1);
}

fn alias_text(alias: &crate::ast::Alias) -> String {
    match &alias.asname {
        Some(asname) => format!("{} as {asname}", alias.name),
        None => alias.name.clone(),
    }
}

/// Sub-expressions that need parentheses when nested
fn is_composite(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::BinOp { .. }
            | Expr::Unary { .. }
            | Expr::BoolOp { .. }
            | Expr::Compare { .. }
            | Expr::IfExp { .. }
            | Expr::Tuple(_)
    )
}

fn write_operand(out: &mut String, expr: &Expr) {
    if is_composite(expr) {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_list(out: &mut String, items: &[Expr]) {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        write_expr(out, item);
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Const(constant) => write_constant(out, constant),
        Expr::Name(name) => out.push_str(name),
        Expr::List(items) => {
            out.push('[');
            write_list(out, items);
            out.push(']');
        }
        Expr::Tuple(items) => {
            out.push('(');
            write_list(out, items);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Expr::Dict(entries) => {
            out.push('{');
            for (idx, (key, value)) in entries.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_expr(out, key);
                out.push_str(": ");
                write_expr(out, value);
            }
            out.push('}');
        }
        Expr::BinOp { left, op, right } => {
            write_operand(out, left);
            let _ = write!(out, " {} ", op.symbol());
            write_operand(out, right);
        }
        Expr::Unary { op, operand } => {
            out.push_str(match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                UnaryOp::Not => "not ",
            });
            write_operand(out, operand);
        }
        Expr::BoolOp { op, left, right } => {
            write_operand(out, left);
            out.push_str(match op {
                BoolOp::And => " and ",
                BoolOp::Or => " or ",
            });
            write_operand(out, right);
        }
        Expr::Compare { left, ops } => {
            write_operand(out, left);
            for (op, right) in ops {
                let _ = write!(out, " {} ", op.symbol());
                write_operand(out, right);
            }
        }
        Expr::Call { func, args } => {
            write_operand(out, func);
            out.push('(');
            write_list(out, args);
            out.push(')');
        }
        Expr::Attribute { value, attr } => {
            write_operand(out, value);
            out.push('.');
            out.push_str(attr);
        }
        Expr::Subscript { value, index } => {
            write_operand(out, value);
            out.push('[');
            write_expr(out, index);
            out.push(']');
        }
        Expr::IfExp { test, body, orelse } => {
            write_operand(out, body);
            out.push_str(" if ");
            write_operand(out, test);
            out.push_str(" else ");
            write_operand(out, orelse);
        }
    }
}

fn write_constant(out: &mut String, constant: &Constant) {
    match constant {
        Constant::None => out.push_str("None"),
        Constant::Bool(true) => out.push_str("True"),
        Constant::Bool(false) => out.push_str("False"),
        Constant::Int(value) => {
            let _ = write!(out, "{value}");
        }
        Constant::Float(value) => {
            let _ = write!(out, "{value:?}");
        }
        Constant::Str(text) => {
            out.push('\'');
            for c in text.chars() {
                match c {
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('\'');
        }
    }
}
