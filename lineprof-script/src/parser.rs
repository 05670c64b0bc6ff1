//! Recursive-descent parser
//!
//! Grammar follows Python's for the supported subset. Operator precedence,
//! lowest first: conditional expression, `or`, `and`, `not`, comparisons,
//! `+ -`, `* / // %`, unary `- +`, `**`, postfix (call, subscript, attribute).

use crate::ast::{
    Alias, BinOp, Block, BoolOp, CmpOp, Constant, Expr, Handler, Program, Stmt, StmtKind, UnaryOp,
};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Tok, Token};
use lineprof_common::LineNo;

/// Parse source text into a [`Program`]
///
/// # Errors
/// Returns the first [`SyntaxError`] encountered.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0, loop_depth: 0 };
    let mut body = Vec::new();
    while !parser.at(&Tok::Eof) {
        body.extend(parser.statement()?);
    }
    Ok(Program { body })
}

type PResult<T> = Result<T, SyntaxError>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Enclosing loops in the current function (for break/continue checks)
    loop_depth: usize,
}

impl Parser {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> LineNo {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, tok: &Tok) -> bool {
        self.peek() == tok
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Keyword(k) if *k == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.line(), message)
    }

    fn unexpected(&self) -> SyntaxError {
        let found = match self.peek() {
            Tok::Name(n) => format!("name '{n}'"),
            Tok::Keyword(k) => format!("'{k}'"),
            Tok::Int(i) => format!("number {i}"),
            Tok::Float(f) => format!("number {f}"),
            Tok::Str(_) => "string".to_string(),
            Tok::Op(o) => format!("'{o}'"),
            Tok::Newline => "end of line".to_string(),
            Tok::Indent => "unexpected indent".to_string(),
            Tok::Dedent => "dedent".to_string(),
            Tok::Eof => "end of file".to_string(),
        };
        self.error(format!("invalid syntax near {found}"))
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{kw}'")))
        }
    }

    fn expect_name(&mut self) -> PResult<String> {
        match self.peek().clone() {
            Tok::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn expect_newline(&mut self) -> PResult<()> {
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::Eof => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// One logical line; may yield several statements joined by `;`
    fn statement(&mut self) -> PResult<Vec<Stmt>> {
        let compound = match self.peek() {
            Tok::Keyword("if") => Some(self.if_statement()?),
            Tok::Keyword("while") => Some(self.while_statement()?),
            Tok::Keyword("for") => Some(self.for_statement()?),
            Tok::Keyword("try") => Some(self.try_statement()?),
            Tok::Keyword("def") => Some(self.function_def()?),
            Tok::Keyword("class") => Some(self.class_def()?),
            Tok::Keyword("with") => Some(self.with_statement()?),
            Tok::Indent => return Err(self.error("unexpected indent")),
            _ => None,
        };
        if let Some(stmt) = compound {
            return Ok(vec![stmt]);
        }
        self.simple_statements()
    }

    fn simple_statements(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = vec![self.simple_statement()?];
        while self.eat_op(";") {
            if matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
            stmts.push(self.simple_statement()?);
        }
        self.expect_newline()?;
        Ok(stmts)
    }

    fn simple_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        let kind = match self.peek().clone() {
            Tok::Keyword("pass") => {
                self.advance();
                StmtKind::Pass
            }
            Tok::Keyword("break") => {
                if self.loop_depth == 0 {
                    return Err(self.error("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            Tok::Keyword("continue") => {
                if self.loop_depth == 0 {
                    return Err(self.error("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            Tok::Keyword("return") => {
                self.advance();
                if self.at_line_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expr_list()?))
                }
            }
            Tok::Keyword("raise") => {
                self.advance();
                if self.at_line_end() {
                    StmtKind::Raise(None)
                } else {
                    StmtKind::Raise(Some(self.expr()?))
                }
            }
            Tok::Keyword("global") => {
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.eat_op(",") {
                    names.push(self.expect_name()?);
                }
                StmtKind::Global(names)
            }
            Tok::Keyword("del") => {
                self.advance();
                let mut targets = vec![self.target()?];
                while self.eat_op(",") {
                    targets.push(self.target()?);
                }
                StmtKind::Delete(targets)
            }
            Tok::Keyword("assert") => {
                self.advance();
                let test = self.expr()?;
                let msg = if self.eat_op(",") { Some(self.expr()?) } else { None };
                StmtKind::Assert { test, msg }
            }
            Tok::Keyword("import") => {
                self.advance();
                let mut names = vec![self.alias()?];
                while self.eat_op(",") {
                    names.push(self.alias()?);
                }
                StmtKind::Import(names)
            }
            Tok::Keyword("from") => {
                self.advance();
                let module = self.dotted_name()?;
                self.expect_kw("import")?;
                let mut names = vec![self.alias()?];
                while self.eat_op(",") {
                    names.push(self.alias()?);
                }
                StmtKind::ImportFrom { module, names }
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt::new(line, kind))
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), Tok::Newline | Tok::Eof) || self.at_op(";")
    }

    fn dotted_name(&mut self) -> PResult<String> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn alias(&mut self) -> PResult<Alias> {
        let name = self.dotted_name()?;
        let asname = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
        Ok(Alias { name, asname })
    }

    fn expression_statement(&mut self) -> PResult<StmtKind> {
        let first = self.expr_list()?;

        let aug = match self.peek() {
            Tok::Op("+=") => Some(BinOp::Add),
            Tok::Op("-=") => Some(BinOp::Sub),
            Tok::Op("*=") => Some(BinOp::Mul),
            Tok::Op("/=") => Some(BinOp::Div),
            Tok::Op("//=") => Some(BinOp::FloorDiv),
            Tok::Op("%=") => Some(BinOp::Mod),
            Tok::Op("**=") => Some(BinOp::Pow),
            _ => None,
        };
        if let Some(op) = aug {
            if !matches!(first, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(self.error("illegal expression for augmented assignment"));
            }
            self.advance();
            let value = self.expr_list()?;
            return Ok(StmtKind::AugAssign { target: first, op, value });
        }

        if !self.at_op("=") {
            return Ok(StmtKind::Expr(first));
        }

        let mut targets = vec![first];
        while self.eat_op("=") {
            targets.push(self.expr_list()?);
        }
        let value = targets.pop().unwrap_or(Expr::Const(Constant::None));
        if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
            return Err(self.error(format!("cannot assign to {}", describe(bad))));
        }
        Ok(StmtKind::Assign { targets, value })
    }

    /// Suite after a `:`: either an indented block or simple statements on the same line
    fn block(&mut self) -> PResult<Block> {
        self.expect_op(":")?;
        if !self.at(&Tok::Newline) {
            return self.simple_statements();
        }
        self.advance();
        if !self.at(&Tok::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();
        let mut body = Vec::new();
        while !self.at(&Tok::Dedent) && !self.at(&Tok::Eof) {
            body.extend(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn loop_block(&mut self) -> PResult<Block> {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        body
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance(); // `if` or `elif`
        let test = self.expr()?;
        let body = self.block()?;
        let orelse = if self.at_kw("elif") {
            vec![self.if_statement()?]
        } else if self.eat_kw("else") {
            self.block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::new(line, StmtKind::If { test, body, orelse }))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let test = self.expr()?;
        let body = self.loop_block()?;
        let orelse = if self.eat_kw("else") { self.block()? } else { Vec::new() };
        Ok(Stmt::new(line, StmtKind::While { test, body, orelse }))
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let target = self.target_list()?;
        self.expect_kw("in")?;
        let iter = self.expr_list()?;
        let body = self.loop_block()?;
        let orelse = if self.eat_kw("else") { self.block()? } else { Vec::new() };
        Ok(Stmt::new(line, StmtKind::For { target, iter, body, orelse }))
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let body = self.block()?;
        let mut handlers = Vec::new();
        while self.at_kw("except") {
            let handler_line = self.line();
            self.advance();
            let (kind, name) = if self.at_op(":") {
                (None, None)
            } else {
                let kind = self.expr()?;
                let name = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
                (Some(kind), name)
            };
            let body = self.block()?;
            handlers.push(Handler { line: handler_line, kind, name, body });
        }
        let orelse = if !handlers.is_empty() && self.eat_kw("else") {
            self.block()?
        } else {
            Vec::new()
        };
        let finalbody = if self.eat_kw("finally") { self.block()? } else { Vec::new() };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error("expected 'except' or 'finally' block"));
        }
        Ok(Stmt::new(line, StmtKind::Try { body, handlers, orelse, finalbody }))
    }

    fn function_def(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let mut params = Vec::new();
        while !self.at_op(")") {
            let param = self.expect_name()?;
            if params.contains(&param) {
                return Err(self.error(format!("duplicate argument '{param}' in function definition")));
            }
            params.push(param);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.expr()?;
        }

        // Loops do not extend into nested function bodies
        let saved_loops = std::mem::take(&mut self.loop_depth);
        let body = self.block();
        self.loop_depth = saved_loops;

        Ok(Stmt::new(line, StmtKind::FunctionDef { name, params, body: body? }))
    }

    fn class_def(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let name = self.expect_name()?;
        if self.eat_op("(") {
            if !self.at_op(")") {
                return Err(self.error("class bases are not supported"));
            }
            self.expect_op(")")?;
        }
        let saved_loops = std::mem::take(&mut self.loop_depth);
        let body = self.block();
        self.loop_depth = saved_loops;
        Ok(Stmt::new(line, StmtKind::ClassDef { name, body: body? }))
    }

    fn with_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let context = self.expr()?;
        let alias = if self.eat_kw("as") { Some(self.expect_name()?) } else { None };
        let body = self.block()?;
        Ok(Stmt::new(line, StmtKind::With { context, alias, body }))
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// Single assignment target (postfix expression)
    fn target(&mut self) -> PResult<Expr> {
        let target = self.postfix()?;
        if target.is_assignable() {
            Ok(target)
        } else {
            Err(self.error(format!("cannot delete or assign to {}", describe(&target))))
        }
    }

    /// `a` or `a, b` in a `for` header
    fn target_list(&mut self) -> PResult<Expr> {
        let first = self.target()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_kw("in") {
                break;
            }
            items.push(self.target()?);
        }
        Ok(Expr::Tuple(items))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Comma-separated expressions; more than one (or a trailing comma) makes a tuple
    fn expr_list(&mut self) -> PResult<Expr> {
        let first = self.expr()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.starts_expression() {
                items.push(self.expr()?);
            } else {
                break;
            }
        }
        Ok(Expr::Tuple(items))
    }

    fn starts_expression(&self) -> bool {
        match self.peek() {
            Tok::Name(_) | Tok::Int(_) | Tok::Float(_) | Tok::Str(_) => true,
            Tok::Keyword(k) => matches!(*k, "None" | "True" | "False" | "not"),
            Tok::Op(o) => matches!(*o, "(" | "[" | "{" | "-" | "+"),
            _ => false,
        }
    }

    fn expr(&mut self) -> PResult<Expr> {
        let body = self.or_expr()?;
        if !self.at_kw("if") {
            return Ok(body);
        }
        self.advance();
        let test = self.or_expr()?;
        self.expect_kw("else")?;
        let orelse = self.expr()?;
        Ok(Expr::IfExp { test: Box::new(test), body: Box::new(body), orelse: Box::new(orelse) })
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat_kw("or") {
            let right = self.and_expr()?;
            left = Expr::BoolOp { op: BoolOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut left = self.not_expr()?;
        while self.eat_kw("and") {
            let right = self.not_expr()?;
            left = Expr::BoolOp { op: BoolOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> PResult<Expr> {
        if self.eat_kw("not") {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand) });
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek() {
            Tok::Op("==") => CmpOp::Eq,
            Tok::Op("!=") => CmpOp::NotEq,
            Tok::Op("<") => CmpOp::Lt,
            Tok::Op("<=") => CmpOp::LtE,
            Tok::Op(">") => CmpOp::Gt,
            Tok::Op(">=") => CmpOp::GtE,
            Tok::Keyword("in") => CmpOp::In,
            Tok::Keyword("not") if matches!(self.peek_at(1), Tok::Keyword("in")) => {
                self.advance();
                CmpOp::NotIn
            }
            Tok::Keyword("is") => {
                if matches!(self.peek_at(1), Tok::Keyword("not")) {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let left = self.arith()?;
        let mut ops = Vec::new();
        while let Some(op) = self.comparison_op() {
            ops.push((op, self.arith()?));
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare { left: Box::new(left), ops })
        }
    }

    fn arith(&mut self) -> PResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinOp::Add,
                Tok::Op("-") => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right) };
        }
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinOp::Mul,
                Tok::Op("/") => BinOp::Div,
                Tok::Op("//") => BinOp::FloorDiv,
                Tok::Op("%") => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right) };
        }
    }

    fn factor(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            Tok::Op("-") => UnaryOp::Neg,
            Tok::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn power(&mut self) -> PResult<Expr> {
        let base = self.postfix()?;
        if self.eat_op("**") {
            // Right-associative, binds tighter than unary minus on its left
            let exponent = self.factor()?;
            return Ok(Expr::BinOp { left: Box::new(base), op: BinOp::Pow, right: Box::new(exponent) });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("(") {
                let mut args = Vec::new();
                while !self.at_op(")") {
                    args.push(self.expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(")")?;
                expr = Expr::Call { func: Box::new(expr), args };
            } else if self.eat_op("[") {
                let index = self.expr_list()?;
                self.expect_op("]")?;
                expr = Expr::Subscript { value: Box::new(expr), index: Box::new(index) };
            } else if self.eat_op(".") {
                let attr = self.expect_name()?;
                expr = Expr::Attribute { value: Box::new(expr), attr };
            } else {
                return Ok(expr);
            }
        }
    }

    fn atom(&mut self) -> PResult<Expr> {
        let expr = match self.peek().clone() {
            Tok::Name(name) => {
                self.advance();
                Expr::Name(name)
            }
            Tok::Int(value) => {
                self.advance();
                Expr::Const(Constant::Int(value))
            }
            Tok::Float(value) => {
                self.advance();
                Expr::Const(Constant::Float(value))
            }
            Tok::Str(first) => {
                self.advance();
                let mut text = first;
                // Adjacent literals concatenate
                while let Tok::Str(next) = self.peek().clone() {
                    self.advance();
                    text.push_str(&next);
                }
                Expr::Const(Constant::Str(text))
            }
            Tok::Keyword("None") => {
                self.advance();
                Expr::Const(Constant::None)
            }
            Tok::Keyword("True") => {
                self.advance();
                Expr::Const(Constant::Bool(true))
            }
            Tok::Keyword("False") => {
                self.advance();
                Expr::Const(Constant::Bool(false))
            }
            Tok::Op("(") => {
                self.advance();
                if self.eat_op(")") {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.expr_list()?;
                self.expect_op(")")?;
                inner
            }
            Tok::Op("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.at_op("]") {
                    items.push(self.expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Expr::List(items)
            }
            Tok::Op("{") => {
                self.advance();
                let mut entries = Vec::new();
                while !self.at_op("}") {
                    let key = self.expr()?;
                    self.expect_op(":")?;
                    let value = self.expr()?;
                    entries.push((key, value));
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("}")?;
                Expr::Dict(entries)
            }
            _ => return Err(self.unexpected()),
        };
        Ok(expr)
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Const(_) => "literal",
        Expr::Call { .. } => "function call",
        Expr::BinOp { .. } | Expr::Unary { .. } => "expression",
        Expr::BoolOp { .. } => "boolean expression",
        Expr::Compare { .. } => "comparison",
        Expr::IfExp { .. } => "conditional expression",
        Expr::Dict(_) => "dict display",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(source: &str) -> Vec<Stmt> {
        parse(source).unwrap().body
    }

    #[test]
    fn test_statement_lines() {
        let stmts = body("x = 1\n\ny = x + 1\nreturn y\n");
        let lines: Vec<_> = stmts.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
        assert!(matches!(stmts[2].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn test_semicolons_share_a_line() {
        let stmts = body("x = 1; y = 2\n");
        assert_eq!(stmts.len(), 2);
        assert!(stmts.iter().all(|s| s.line == 1));
    }

    #[test]
    fn test_elif_nests_in_orelse() {
        let stmts = body("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let StmtKind::If { orelse, .. } = &stmts[0].kind else { panic!("expected if") };
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].line, 3);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else { panic!("expected elif") };
        assert_eq!(inner[0].line, 6);
    }

    #[test]
    fn test_precedence() {
        let stmts = body("x = 1 + 2 * 3 ** 2\n");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else { panic!() };
        let Expr::BinOp { op: BinOp::Add, right, .. } = value else { panic!("expected +") };
        assert!(matches!(**right, Expr::BinOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_try_with_all_clauses() {
        let src = "try:\n    a()\nexcept ValueError as e:\n    b()\nexcept:\n    c()\nelse:\n    d()\nfinally:\n    e()\n";
        let stmts = body(src);
        let StmtKind::Try { handlers, orelse, finalbody, .. } = &stmts[0].kind else { panic!() };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert!(handlers[1].kind.is_none());
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
    }

    #[test]
    fn test_tuple_unpacking_and_chained_assign() {
        let stmts = body("a, b = b, a\nx = y = 0\n");
        let StmtKind::Assign { targets, value } = &stmts[0].kind else { panic!() };
        assert!(matches!(targets[0], Expr::Tuple(_)));
        assert!(matches!(value, Expr::Tuple(_)));
        let StmtKind::Assign { targets, .. } = &stmts[1].kind else { panic!() };
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_inline_block() {
        let stmts = body("if x: y = 1; z = 2\n");
        let StmtKind::If { body, .. } = &stmts[0].kind else { panic!() };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        let err = parse("break\n").unwrap_err();
        assert!(err.message.contains("outside loop"));
        let err = parse("while x:\n    def f():\n        break\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_module_level_return_allowed() {
        assert!(parse("return 1\n").is_ok());
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse("f() = 1\n").is_err());
        assert!(parse("1 += 2\n").is_err());
    }

    #[test]
    fn test_not_in_and_is_not() {
        let stmts = body("x = a not in b\ny = a is not None\n");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else { panic!() };
        assert!(matches!(value, Expr::Compare { ops, .. } if ops[0].0 == CmpOp::NotIn));
        let StmtKind::Assign { value, .. } = &stmts[1].kind else { panic!() };
        assert!(matches!(value, Expr::Compare { ops, .. } if ops[0].0 == CmpOp::IsNot));
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(parse("").unwrap(), Program::default());
    }
}
