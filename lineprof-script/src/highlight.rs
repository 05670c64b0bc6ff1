//! Keyword span extraction for display
//!
//! Works on one physical line at a time, so it never needs the parser and
//! tolerates lines that are not valid on their own (continuations, broken
//! code). Keywords inside string literals and comments are not reported.

use crate::lexer::KEYWORDS;
use unicode_width::UnicodeWidthChar;

/// A keyword occurrence at a display column of a source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSpan {
    /// Terminal cells from the start of the line (wide characters count two)
    pub column: usize,
    pub text: &'static str,
}

/// Keyword spans of a line, ordered by column
#[must_use]
pub fn keyword_spans(line: &str) -> Vec<KeywordSpan> {
    let chars: Vec<char> = line.chars().collect();
    // display column at which each character starts
    let columns: Vec<usize> = chars
        .iter()
        .scan(0, |column, c| {
            let start = *column;
            *column += c.width().unwrap_or(0);
            Some(start)
        })
        .collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if let Some(&text) = KEYWORDS.iter().find(|&&kw| kw == word) {
                spans.push(KeywordSpan { column: columns[start], text });
            }
        } else if c.is_ascii_digit() {
            // Skip whole literal so `1e5` or `0x` tails are not read as names
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_keywords_with_columns() {
        let spans = keyword_spans("    if x is not None:");
        let found: Vec<_> = spans.iter().map(|s| (s.column, s.text)).collect();
        assert_eq!(found, vec![(4, "if"), (9, "is"), (12, "not"), (16, "None")]);
    }

    #[test]
    fn test_skips_strings_and_comments() {
        let spans = keyword_spans("print('if else') # return");
        assert!(spans.is_empty());
    }

    #[test]
    fn test_whole_words_only() {
        assert!(keyword_spans("iffy = format_in").is_empty());
    }

    #[test]
    fn test_columns_count_display_cells() {
        let spans = keyword_spans("s = 'é'; return s");
        assert_eq!(spans[0].column, 9);

        let spans = keyword_spans("s = '漢字'; return s");
        assert_eq!(spans[0].column, 12);
    }
}
