//! Source text as displayed
//!
//! Lines are split once at load time, tabs expanded to spaces, and keyword
//! spans computed on the expanded text so their columns match what is drawn.

use lineprof_common::LineNo;
use lineprof_script::{keyword_spans, KeywordSpan};
use unicode_width::UnicodeWidthChar;

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub text: String,
    pub keywords: Vec<KeywordSpan>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceText {
    lines: Vec<SourceLine>,
}

impl SourceText {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let lines = source
            .lines()
            .map(|raw| {
                let text = expand_tabs(raw);
                let keywords = keyword_spans(&text);
                SourceLine { text, keywords }
            })
            .collect();
        Self { lines }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based lookup, matching statement line numbers
    #[must_use]
    pub fn line(&self, line: LineNo) -> Option<&SourceLine> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        self.lines.get(index)
    }

    /// Lines from a 0-based index onward
    #[must_use]
    pub fn from_index(&self, index: usize) -> &[SourceLine] {
        self.lines.get(index..).unwrap_or(&[])
    }
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - column % TAB_WIDTH;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += c.width().unwrap_or(0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_one_based() {
        let source = SourceText::new("a = 1\nif a:\n    pass\n");
        assert_eq!(source.len(), 3);
        assert_eq!(source.line(1).map(|l| l.text.as_str()), Some("a = 1"));
        assert!(source.line(0).is_none());
        assert!(source.line(4).is_none());
        assert_eq!(source.from_index(2).len(), 1);
        assert!(source.from_index(10).is_empty());
    }

    #[test]
    fn test_tabs_expand_before_keyword_columns() {
        let source = SourceText::new("x\tif y:");
        let line = source.line(1).unwrap();
        assert_eq!(line.text, "x       if y:");
        assert_eq!(line.keywords[0].column, 8);
    }

    #[test]
    fn test_tab_stops_after_wide_characters() {
        let source = SourceText::new("字\tif y:");
        let line = source.line(1).unwrap();
        assert_eq!(line.text, "字      if y:");
        assert_eq!(line.keywords[0].column, 8);
    }

    #[test]
    fn test_empty_source() {
        let source = SourceText::new("");
        assert!(source.is_empty());
        assert!(source.line(1).is_none());
    }
}
