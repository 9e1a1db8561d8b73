//! Statement splitter.
//!
//! Splits a script on top-level `;` terminators. Semicolons inside literals
//! and comments never split, because the split runs over the segments produced
//! by [`segment::tokenize`].

pub mod segment;

use crate::error::SqlPortResult;
use segment::{LineIndex, SegmentKind, tokenize};

/// One statement of a script, as produced by [`split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text, trimmed, including its terminator when it had one.
    pub text: String,
    /// Byte offset of the first non-blank character in the source script.
    pub offset: usize,
    /// 1-based line of `offset`.
    pub line: usize,
    /// Whether the statement ended with `;` rather than end of input.
    pub terminated: bool,
}

impl Statement {
    pub fn new(text: impl Into<String>, offset: usize, line: usize) -> Self {
        let text = text.into();
        let terminated = text.ends_with(';');
        Self {
            text,
            offset,
            line,
            terminated,
        }
    }

    /// The statement text without its trailing terminator.
    pub fn body(&self) -> &str {
        self.text
            .strip_suffix(';')
            .map(str::trim_end)
            .unwrap_or(&self.text)
    }

    /// Derive a statement at the same source position with new text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::new(text, self.offset, self.line)
    }
}

/// Split `script` into statements.
///
/// Fails without returning any statement when the input ends inside a literal
/// or block comment.
pub fn split(script: &str) -> SqlPortResult<Vec<Statement>> {
    let segments = tokenize(script)?;
    let lines = LineIndex::new(script);
    let mut statements = Vec::new();
    let mut start = 0;

    for segment in &segments {
        if segment.kind != SegmentKind::Code {
            continue;
        }
        for (i, _) in segment.text.match_indices(';') {
            let end = segment.offset + i + 1;
            push_statement(&mut statements, script, &lines, start, end);
            start = end;
        }
    }
    push_statement(&mut statements, script, &lines, start, script.len());

    Ok(statements)
}

fn push_statement(
    statements: &mut Vec<Statement>,
    script: &str,
    lines: &LineIndex,
    start: usize,
    end: usize,
) {
    let raw = &script[start..end];
    let text = raw.trim();
    if text.is_empty() || text == ";" {
        return;
    }
    let offset = start + (raw.len() - raw.trim_start().len());
    statements.push(Statement::new(text, offset, lines.line_of(offset)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_literals() {
        let stmts = split("INSERT INTO t VALUES ('a;b'); SELECT 1;").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "INSERT INTO t VALUES ('a;b');");
        assert_eq!(stmts[1].text, "SELECT 1;");
        assert_eq!(stmts[1].offset, 30);
    }

    #[test]
    fn test_split_respects_comments() {
        let script = "SELECT 1 -- a;b\n; /* c;d */ SELECT 2";
        let stmts = split(script).unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "SELECT 1 -- a;b\n;");
        assert_eq!(stmts[1].text, "/* c;d */ SELECT 2");
        assert!(!stmts[1].terminated);
    }

    #[test]
    fn test_split_tracks_lines() {
        let stmts = split("SELECT 1;\n\n  SELECT 2;\nSELECT 3").unwrap();
        let lines: Vec<usize> = stmts.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
        assert_eq!(stmts[1].offset, 13);
    }

    #[test]
    fn test_split_drops_empty_statements() {
        let stmts = split(";;  ;\n SELECT 1;;").unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].body(), "SELECT 1");
    }

    #[test]
    fn test_split_unterminated_literal_is_fatal() {
        let err = split("SELECT 1; SELECT 'abc").unwrap_err();
        assert_eq!(err.offset(), Some(17));
    }

    #[test]
    fn test_double_quoted_semicolon() {
        let stmts = split("SELECT \"a;b\" FROM t; SELECT 2").unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].body(), "SELECT \"a;b\" FROM t");
    }
}
