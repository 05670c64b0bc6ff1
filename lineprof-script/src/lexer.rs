//! Indentation-aware tokenizer
//!
//! Produces a flat token stream with explicit `Newline`, `Indent` and `Dedent`
//! tokens so the parser never has to look at whitespace. Newlines inside
//! brackets and after a trailing backslash are swallowed (implicit and
//! explicit line joining). Blank and comment-only lines produce nothing.

use crate::error::SyntaxError;
use lineprof_common::LineNo;

/// Reserved words of the language (also used by the highlighter)
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
    "not", "or", "pass", "raise", "return", "try", "while", "with",
];

const OPERATORS_3: &[&str] = &["//=", "**="];
const OPERATORS_2: &[&str] =
    &["==", "!=", "<=", ">=", "//", "**", "+=", "-=", "*=", "/=", "%=", "->"];
const OPERATORS_1: &[&str] =
    &["+", "-", "*", "/", "%", "<", ">", "=", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";"];

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Keyword(&'static str),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: LineNo,
}

/// Tokenize a whole source file
///
/// # Errors
/// Returns a [`SyntaxError`] for unterminated strings, unknown characters,
/// unbalanced brackets and inconsistent dedents.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer { tokens: Vec::new(), indents: vec![0], depth: 0 };
    let mut last_line: LineNo = 1;
    let mut joining = false;

    for (idx, raw) in source.lines().enumerate() {
        let line = LineNo::try_from(idx + 1).unwrap_or(LineNo::MAX);
        last_line = line;
        let chars: Vec<char> = raw.chars().collect();

        let (width, start) = indentation(&chars);
        let rest_is_blank = chars[start..].iter().all(|c| c.is_whitespace())
            || chars.get(start) == Some(&'#');

        let continuing = lexer.depth > 0 || joining;
        if !continuing {
            if rest_is_blank {
                continue;
            }
            lexer.indent_to(width, line)?;
        }

        joining = lexer.scan_line(&chars, start, line)?;
        if lexer.depth == 0 && !joining && lexer.has_pending_tokens() {
            lexer.push(Tok::Newline, line);
        }
    }

    if lexer.depth > 0 {
        return Err(SyntaxError::new(last_line, "unexpected EOF: unclosed bracket"));
    }
    if lexer.has_pending_tokens() {
        lexer.push(Tok::Newline, last_line);
    }
    while lexer.indents.len() > 1 {
        lexer.indents.pop();
        lexer.push(Tok::Dedent, last_line);
    }
    lexer.push(Tok::Eof, last_line);
    Ok(lexer.tokens)
}

/// Measure leading whitespace, returning (column width, first non-blank index)
fn indentation(chars: &[char]) -> (usize, usize) {
    let mut width = 0;
    for (idx, &c) in chars.iter().enumerate() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
            '\x0c' => width = 0,
            _ => return (width, idx),
        }
    }
    (width, chars.len())
}

struct Lexer {
    tokens: Vec<Token>,
    indents: Vec<usize>,
    depth: usize,
}

impl Lexer {
    fn push(&mut self, tok: Tok, line: LineNo) {
        self.tokens.push(Token { tok, line });
    }

    /// True if the current logical line has produced tokens not yet terminated
    fn has_pending_tokens(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.tok),
            Some(tok) if !matches!(tok, Tok::Newline | Tok::Indent | Tok::Dedent)
        )
    }

    fn indent_to(&mut self, width: usize, line: LineNo) -> Result<(), SyntaxError> {
        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            self.indents.push(width);
            self.push(Tok::Indent, line);
        } else if width < current {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.push(Tok::Dedent, line);
            }
            if self.indents.last() != Some(&width) {
                return Err(SyntaxError::new(
                    line,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(())
    }

    /// Scan one physical line; returns true if it ends with a line-joining backslash
    fn scan_line(&mut self, chars: &[char], start: usize, line: LineNo) -> Result<bool, SyntaxError> {
        let mut i = start;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
            } else if c == '#' {
                break;
            } else if c == '\\' {
                if chars[i + 1..].iter().all(|c| c.is_whitespace()) {
                    return Ok(true);
                }
                return Err(SyntaxError::new(line, "unexpected character after line continuation"));
            } else if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
            {
                i = self.scan_number(chars, i, line)?;
            } else if c.is_alphabetic() || c == '_' {
                let begin = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[begin..i].iter().collect();
                let tok = match KEYWORDS.iter().find(|&&kw| kw == word) {
                    Some(kw) => Tok::Keyword(kw),
                    None => Tok::Name(word),
                };
                self.push(tok, line);
            } else if c == '\'' || c == '"' {
                i = self.scan_string(chars, i, line)?;
            } else {
                i = self.scan_operator(chars, i, line)?;
            }
        }
        Ok(false)
    }

    fn scan_number(&mut self, chars: &[char], start: usize, line: LineNo) -> Result<usize, SyntaxError> {
        let mut i = start;
        let mut is_float = false;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
            i += 1;
        }
        if i < chars.len() && chars[i] == '.' {
            is_float = true;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
        if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
            let mut j = i + 1;
            if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                j += 1;
            }
            if j < chars.len() && chars[j].is_ascii_digit() {
                is_float = true;
                i = j;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
        }
        let text: String = chars[start..i].iter().filter(|&&c| c != '_').collect();
        let tok = if is_float {
            Tok::Float(text.parse().map_err(|_| SyntaxError::new(line, format!("invalid number '{text}'")))?)
        } else {
            Tok::Int(text.parse().map_err(|_| {
                SyntaxError::new(line, format!("integer literal too large: {text}"))
            })?)
        };
        self.push(tok, line);
        Ok(i)
    }

    fn scan_string(&mut self, chars: &[char], start: usize, line: LineNo) -> Result<usize, SyntaxError> {
        let quote = chars[start];
        let mut value = String::new();
        let mut i = start + 1;
        while i < chars.len() {
            match chars[i] {
                c if c == quote => {
                    self.push(Tok::Str(value), line);
                    return Ok(i + 1);
                }
                '\\' if i + 1 < chars.len() => {
                    let escaped = match chars[i + 1] {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    };
                    if !matches!(chars[i + 1], 'n' | 't' | 'r' | '0' | '\\' | '\'' | '"') {
                        value.push('\\');
                    }
                    value.push(escaped);
                    i += 2;
                }
                c => {
                    value.push(c);
                    i += 1;
                }
            }
        }
        Err(SyntaxError::new(line, "unterminated string literal"))
    }

    fn scan_operator(&mut self, chars: &[char], start: usize, line: LineNo) -> Result<usize, SyntaxError> {
        for (table, len) in [(OPERATORS_3, 3), (OPERATORS_2, 2), (OPERATORS_1, 1)] {
            if start + len > chars.len() {
                continue;
            }
            let candidate: String = chars[start..start + len].iter().collect();
            if let Some(&op) = table.iter().find(|&&op| op == candidate) {
                match op {
                    "(" | "[" | "{" => self.depth += 1,
                    ")" | "]" | "}" => {
                        self.depth = self.depth.checked_sub(1).ok_or_else(|| {
                            SyntaxError::new(line, format!("unmatched '{op}'"))
                        })?;
                    }
                    _ => {}
                }
                self.push(Tok::Op(op), line);
                return Ok(start + len);
            }
        }
        Err(SyntaxError::new(line, format!("invalid character '{}'", chars[start])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![Tok::Name("x".into()), Tok::Op("="), Tok::Int(1), Tok::Newline, Tok::Eof]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(toks.contains(&Tok::Indent));
        assert!(toks.contains(&Tok::Dedent));
        let indent_pos = toks.iter().position(|t| *t == Tok::Indent).unwrap();
        assert_eq!(toks[indent_pos - 1], Tok::Newline);
    }

    #[test]
    fn test_brackets_join_lines() {
        let toks = kinds("x = [1,\n     2]\n");
        assert_eq!(toks.iter().filter(|t| **t == Tok::Newline).count(), 1);
        assert!(!toks.contains(&Tok::Indent));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let tokens = tokenize("\n# comment\n\nx = 1  # trailing\n").unwrap();
        assert_eq!(tokens[0].line, 4);
        assert_eq!(tokens.iter().filter(|t| t.tok == Tok::Newline).count(), 1);
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            kinds("a = 1.5e3 + 'it\\'s'\n")[2..5],
            [Tok::Float(1500.0), Tok::Op("+"), Tok::Str("it's".into())]
        );
    }

    #[test]
    fn test_keywords_recognized() {
        assert_eq!(kinds("return None\n")[..2], [Tok::Keyword("return"), Tok::Keyword("None")]);
    }

    #[test]
    fn test_bad_dedent_is_error() {
        let err = tokenize("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(tokenize("x = 'abc\n").is_err());
    }

    #[test]
    fn test_eof_closes_indents() {
        let toks = kinds("while x:\n    if y:\n        z = 1");
        assert_eq!(toks.iter().filter(|t| **t == Tok::Dedent).count(), 2);
        assert_eq!(toks.last(), Some(&Tok::Eof));
    }
}
