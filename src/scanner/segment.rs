//! Quote- and comment-aware segmentation.
//!
//! Every rule in the pipeline works on [`GuardedSql`]: the statement text with
//! each string literal and comment swapped for an opaque placeholder. Patterns
//! therefore can never match inside a literal or a comment, and [`GuardedSql::restore`]
//! puts the original bytes back afterwards.
//!
//! ```text
//! SELECT 'a;b' -- note
//! ───┬── ──┬── ───┬───
//!    │     │      └── Segment::LineComment  →  \u{E002}0\u{E003}
//!    │     └── Segment::Literal             →  \u{E000}0\u{E001}
//!    └── Segment::Code (kept as-is)
//! ```

use crate::error::{OpenDelimiter, SqlPortError, SqlPortResult};

pub const LITERAL_OPEN: char = '\u{E000}';
pub const LITERAL_CLOSE: char = '\u{E001}';
pub const COMMENT_OPEN: char = '\u{E002}';
pub const COMMENT_CLOSE: char = '\u{E003}';

/// Regex fragment matching one literal placeholder.
pub const LITERAL_PATTERN: &str = r"\x{E000}\d+\x{E001}";

/// Regex fragment matching one comment placeholder.
pub const COMMENT_PATTERN: &str = r"\x{E002}\d+\x{E003}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

/// A contiguous span of the input with a single lexical role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    InLineComment,
    InBlockComment,
}

/// Byte offset to 1-based line number lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self {
            newlines: text
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i)
                .collect(),
        }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset) + 1
    }
}

/// Split `text` into code, literal and comment segments.
///
/// Literals end at the next matching quote character; there is no escape
/// handling, so `'it''s'` becomes two adjacent literals. Input that ends
/// inside a literal or a block comment is a fatal error carrying the offset of
/// the opening delimiter.
pub fn tokenize(text: &str) -> SqlPortResult<Vec<Segment<'_>>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut state = State::Normal;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Normal => match (b, next) {
                (b'\'', _) | (b'"', _) => {
                    push(&mut segments, text, SegmentKind::Code, start, i);
                    start = i;
                    state = if b == b'\'' {
                        State::InSingleQuote
                    } else {
                        State::InDoubleQuote
                    };
                }
                (b'-', Some(b'-')) => {
                    push(&mut segments, text, SegmentKind::Code, start, i);
                    start = i;
                    state = State::InLineComment;
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    push(&mut segments, text, SegmentKind::Code, start, i);
                    start = i;
                    state = State::InBlockComment;
                    i += 1;
                }
                _ => {}
            },
            State::InSingleQuote | State::InDoubleQuote => {
                let quote = if state == State::InSingleQuote { b'\'' } else { b'"' };
                if b == quote {
                    push(&mut segments, text, SegmentKind::Literal, start, i + 1);
                    start = i + 1;
                    state = State::Normal;
                }
            }
            State::InLineComment => {
                if b == b'\n' {
                    // The newline stays with the following code.
                    push(&mut segments, text, SegmentKind::LineComment, start, i);
                    start = i;
                    state = State::Normal;
                }
            }
            State::InBlockComment => {
                if b == b'*' && next == Some(b'/') {
                    push(&mut segments, text, SegmentKind::BlockComment, start, i + 2);
                    start = i + 2;
                    state = State::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    let open = match state {
        State::InSingleQuote => Some(OpenDelimiter::SingleQuote),
        State::InDoubleQuote => Some(OpenDelimiter::DoubleQuote),
        State::InBlockComment => Some(OpenDelimiter::BlockComment),
        State::Normal | State::InLineComment => None,
    };
    if let Some(kind) = open {
        let line = LineIndex::new(text).line_of(start);
        return Err(SqlPortError::unterminated(kind, start, line));
    }

    let kind = if state == State::InLineComment {
        SegmentKind::LineComment
    } else {
        SegmentKind::Code
    };
    push(&mut segments, text, kind, start, bytes.len());

    Ok(segments)
}

fn push<'a>(
    segments: &mut Vec<Segment<'a>>,
    text: &'a str,
    kind: SegmentKind,
    from: usize,
    to: usize,
) {
    if to > from {
        segments.push(Segment {
            kind,
            text: &text[from..to],
            offset: from,
        });
    }
}

pub fn literal_placeholder(index: usize) -> String {
    format!("{LITERAL_OPEN}{index}{LITERAL_CLOSE}")
}

pub fn comment_placeholder(index: usize) -> String {
    format!("{COMMENT_OPEN}{index}{COMMENT_CLOSE}")
}

/// Index of the literal placeholder that makes up all of `token` (after trimming).
pub fn parse_literal_placeholder(token: &str) -> Option<usize> {
    token
        .trim()
        .strip_prefix(LITERAL_OPEN)?
        .strip_suffix(LITERAL_CLOSE)?
        .parse()
        .ok()
}

/// Whether `ch` is one of the placeholder delimiter characters.
pub fn is_placeholder_char(ch: char) -> bool {
    matches!(ch, LITERAL_OPEN | LITERAL_CLOSE | COMMENT_OPEN | COMMENT_CLOSE)
}

/// Statement text with literals and comments swapped for placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedSql {
    code: String,
    literals: Vec<String>,
    comments: Vec<String>,
}

impl GuardedSql {
    pub fn new(sql: &str) -> SqlPortResult<Self> {
        let mut guarded = Self {
            code: String::with_capacity(sql.len()),
            literals: Vec::new(),
            comments: Vec::new(),
        };

        for segment in tokenize(sql)? {
            match segment.kind {
                SegmentKind::Code => guarded.code.push_str(segment.text),
                SegmentKind::Literal => {
                    let placeholder = literal_placeholder(guarded.literals.len());
                    guarded.literals.push(segment.text.to_string());
                    guarded.code.push_str(&placeholder);
                }
                SegmentKind::LineComment | SegmentKind::BlockComment => {
                    let placeholder = comment_placeholder(guarded.comments.len());
                    guarded.comments.push(segment.text.to_string());
                    guarded.code.push_str(&placeholder);
                }
            }
        }

        Ok(guarded)
    }

    /// The code with placeholders in place of literals and comments.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the code, keeping the literal and comment tables.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Full text of literal `index`, quotes included.
    pub fn literal(&self, index: usize) -> Option<&str> {
        self.literals.get(index).map(String::as_str)
    }

    /// Literal body (without its quotes) for a placeholder token.
    pub fn literal_body(&self, token: &str) -> Option<&str> {
        let text = self.literal(parse_literal_placeholder(token)?)?;
        Some(&text[1..text.len() - 1])
    }

    /// Register a new single-quoted literal and return its placeholder.
    pub fn push_literal(&mut self, body: &str) -> String {
        let placeholder = literal_placeholder(self.literals.len());
        self.literals.push(format!("'{body}'"));
        placeholder
    }

    pub fn comments(&self) -> impl Iterator<Item = (usize, &str)> {
        self.comments.iter().enumerate().map(|(i, c)| (i, c.as_str()))
    }

    /// Remove comment `index` from the code. Returns false if it was already gone.
    pub fn drop_comment(&mut self, index: usize) -> bool {
        let placeholder = comment_placeholder(index);
        if !self.code.contains(&placeholder) {
            return false;
        }
        self.code = self.code.replacen(&placeholder, "", 1);
        true
    }

    /// True when the code holds nothing but whitespace and comments.
    pub fn is_comment_only(&self) -> bool {
        strip_placeholders(&self.code, COMMENT_OPEN, COMMENT_CLOSE)
            .trim()
            .is_empty()
    }

    /// 1-based line, in the restored text, of byte `pos` of the code.
    pub fn line_at(&self, pos: usize) -> usize {
        let prefix = self.restore_fragment(&self.code[..pos]);
        prefix.matches('\n').count() + 1
    }

    /// Reassemble the text, putting literals and comments back.
    pub fn restore(&self) -> String {
        self.restore_fragment(&self.code)
    }

    /// Restore a piece of code taken from this statement.
    pub fn restore_fragment(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        let mut chars = code.chars().peekable();

        while let Some(ch) = chars.next() {
            let (table, close) = match ch {
                LITERAL_OPEN => (&self.literals, LITERAL_CLOSE),
                COMMENT_OPEN => (&self.comments, COMMENT_CLOSE),
                _ => {
                    out.push(ch);
                    continue;
                }
            };

            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }

            let restored = match (chars.peek(), digits.parse::<usize>()) {
                (Some(&c), Ok(n)) if c == close => table.get(n),
                _ => None,
            };
            match restored {
                Some(text) => {
                    chars.next();
                    out.push_str(text);
                }
                None => {
                    out.push(ch);
                    out.push_str(&digits);
                }
            }
        }

        out
    }
}

fn strip_placeholders(code: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(code.len());
    let mut inside = false;
    for ch in code.chars() {
        if ch == open {
            inside = true;
        } else if ch == close {
            inside = false;
        } else if !inside {
            out.push(ch);
        }
    }
    out
}
