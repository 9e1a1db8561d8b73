//! SQL pretty printer.
//!
//! Lays out one statement with clause keywords on their own lines, clause
//! bodies indented one level, subqueries and CREATE TABLE column lists
//! indented under their opening parenthesis, and CASE blocks with one
//! `WHEN`/`ELSE` per line. Literals and comments are atomic tokens and are
//! never modified; line comments always sit on their own line and block
//! comments get a blank line on each side.
//!
//! Output only depends on the token sequence and on whether whitespace
//! separated two tokens, so formatting formatted text is a no-op.

use std::fmt::{Result, Write};

use crate::error::SqlPortResult;
use crate::scanner::segment::{SegmentKind, tokenize};

#[cfg(test)]
mod tests;

/// Words printed in upper case.
const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CLUSTER", "COMMENT", "CREATE",
    "CROSS", "DELETE", "DESC", "DISTINCT", "DISTRIBUTE", "DROP", "ELSE", "END", "EXCEPT",
    "EXISTS", "EXTERNAL", "FALSE", "FOLLOWING", "FROM", "FULL", "GROUP", "HAVING", "IF", "IN",
    "INNER", "INSERT", "INTERSECT", "INTERVAL", "INTO", "IS", "JOIN", "LATERAL", "LEFT", "LIKE",
    "LIMIT", "MERGE", "MINUS", "NATURAL", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "OVER", "OVERWRITE", "PARTITION", "PIVOT", "PRECEDING", "QUALIFY", "RANGE", "REPLACE",
    "RIGHT", "RLIKE", "ROWS", "SELECT", "SEMI", "SET", "SORT", "TABLE", "TEMPORARY", "THEN",
    "TRUE", "TRUNCATE", "UNBOUNDED", "UNION", "UNPIVOT", "UPDATE", "USING", "VALUES", "VIEW",
    "WHEN", "WHERE", "WINDOW", "WITH",
];

/// A keyword sequence that starts a new line.
struct Phrase {
    words: &'static [&'static str],
    /// Body goes on the next line, one level deeper.
    nests: bool,
    /// Top-level commas in the body start a new line.
    lists: bool,
}

const fn phrase(words: &'static [&'static str], nests: bool, lists: bool) -> Phrase {
    Phrase { words, nests, lists }
}

/// Line-breaking keywords, longest first where they share a prefix.
const BREAKS: &[Phrase] = &[
    phrase(&["SELECT", "DISTINCT"], true, true),
    phrase(&["SELECT"], true, true),
    phrase(&["FROM"], true, false),
    phrase(&["WHERE"], true, false),
    phrase(&["GROUP", "BY"], true, false),
    phrase(&["ORDER", "BY"], true, false),
    phrase(&["HAVING"], true, false),
    phrase(&["QUALIFY"], true, false),
    phrase(&["LEFT", "OUTER", "JOIN"], false, false),
    phrase(&["RIGHT", "OUTER", "JOIN"], false, false),
    phrase(&["FULL", "OUTER", "JOIN"], false, false),
    phrase(&["LEFT", "SEMI", "JOIN"], false, false),
    phrase(&["LEFT", "JOIN"], false, false),
    phrase(&["RIGHT", "JOIN"], false, false),
    phrase(&["FULL", "JOIN"], false, false),
    phrase(&["INNER", "JOIN"], false, false),
    phrase(&["CROSS", "JOIN"], false, false),
    phrase(&["NATURAL", "JOIN"], false, false),
    phrase(&["JOIN"], false, false),
    phrase(&["UNION", "ALL"], false, false),
    phrase(&["UNION"], false, false),
    phrase(&["INTERSECT"], false, false),
    phrase(&["EXCEPT"], false, false),
    phrase(&["MINUS"], false, false),
    phrase(&["WITH"], false, false),
    phrase(&["CREATE"], false, false),
    phrase(&["INSERT", "INTO"], false, false),
    phrase(&["INSERT", "OVERWRITE"], false, false),
    phrase(&["INSERT"], false, false),
    phrase(&["UPDATE"], false, false),
    phrase(&["DELETE", "FROM"], false, false),
    phrase(&["DELETE"], false, false),
    phrase(&["MERGE"], false, false),
    phrase(&["ALTER"], false, false),
    phrase(&["DROP"], false, false),
    phrase(&["TRUNCATE"], false, false),
    phrase(&["SET"], false, false),
    phrase(&["VALUES"], false, false),
    phrase(&["LIMIT"], false, false),
    phrase(&["LATERAL", "VIEW"], false, false),
    phrase(&["DISTRIBUTE", "BY"], false, false),
    phrase(&["CLUSTER", "BY"], false, false),
    phrase(&["SORT", "BY"], false, false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Literal,
    LineComment,
    BlockComment,
    Open,
    Close,
    Comma,
    Semicolon,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    /// Whitespace preceded the token in the input.
    space_before: bool,
}

fn lex(sql: &str) -> SqlPortResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut space = false;

    for segment in tokenize(sql)? {
        let kind = match segment.kind {
            SegmentKind::Literal => TokenKind::Literal,
            SegmentKind::LineComment => TokenKind::LineComment,
            SegmentKind::BlockComment => TokenKind::BlockComment,
            SegmentKind::Code => {
                lex_code(segment.text, &mut tokens, &mut space);
                continue;
            }
        };
        tokens.push(Token {
            kind,
            text: segment.text.trim_end(),
            space_before: space,
        });
        space = false;
    }

    Ok(tokens)
}

fn lex_code<'a>(code: &'a str, tokens: &mut Vec<Token<'a>>, space: &mut bool) {
    let mut word_start: Option<usize> = None;

    for (i, ch) in code.char_indices() {
        let punct = match ch {
            '(' => Some(TokenKind::Open),
            ')' => Some(TokenKind::Close),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };
        if !ch.is_whitespace() && punct.is_none() {
            word_start.get_or_insert(i);
            continue;
        }

        if let Some(start) = word_start.take() {
            tokens.push(Token {
                kind: TokenKind::Word,
                text: &code[start..i],
                space_before: *space,
            });
            *space = false;
        }
        match punct {
            Some(kind) => {
                tokens.push(Token {
                    kind,
                    text: &code[i..i + 1],
                    space_before: *space,
                });
                *space = false;
            }
            None => *space = true,
        }
    }

    if let Some(start) = word_start {
        tokens.push(Token {
            kind: TokenKind::Word,
            text: &code[start..],
            space_before: *space,
        });
        *space = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Statement,
    Subquery,
    Columns,
    Case,
}

/// Layout state of one nesting level.
#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    /// Indent of clause keywords (or of `CASE`).
    base: usize,
    /// Indent of continuation lines.
    body: usize,
    /// Open inline parentheses; nothing breaks while this is non-zero.
    inline: usize,
    list_commas: bool,
    /// Inside a CREATE clause whose column list has not been seen yet.
    create: bool,
    /// Indent of the closing parenthesis.
    close_indent: usize,
}

impl Frame {
    fn new(kind: FrameKind, base: usize, close_indent: usize) -> Self {
        Self {
            kind,
            base,
            body: base,
            inline: 0,
            list_commas: kind == FrameKind::Columns,
            create: false,
            close_indent,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Group {
    /// Parenthesis laid out inline; holds the index of the owning frame.
    Inline(usize),
    /// Parenthesis that opened the frame at this index.
    Block(usize),
}

pub struct Formatter {
    indent_width: usize,
    line_indent: usize,
    buffer: String,
    frames: Vec<Frame>,
    groups: Vec<Group>,
    /// Indent of the line the next token must start.
    pending: Option<usize>,
    blank_line: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self::with_indent(4)
    }

    pub fn with_indent(indent_width: usize) -> Self {
        Self {
            indent_width,
            line_indent: 0,
            buffer: String::new(),
            frames: vec![Frame::new(FrameKind::Statement, 0, 0)],
            groups: Vec::new(),
            pending: None,
            blank_line: false,
        }
    }

    /// Format one statement (without its terminator).
    pub fn format(mut self, sql: &str) -> SqlPortResult<String> {
        let tokens = lex(sql)?;
        let mut i = 0;
        while i < tokens.len() {
            i += self.visit(&tokens, i)?;
        }
        Ok(self.buffer.trim_end().to_string())
    }

    fn top(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::new(FrameKind::Statement, 0, 0));
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn indent(&mut self) -> Result {
        let width = self.line_indent * self.indent_width;
        write!(self.buffer, "{:width$}", "")
    }

    fn content_indent(&mut self) -> usize {
        match self.pending {
            Some(indent) => indent,
            None => self.top().body,
        }
    }

    fn write_token(&mut self, text: &str, space_before: bool) -> Result {
        if let Some(indent) = self.pending.take() {
            if !self.buffer.is_empty() {
                writeln!(self.buffer)?;
                if std::mem::take(&mut self.blank_line) {
                    writeln!(self.buffer)?;
                }
            }
            self.line_indent = indent;
            self.indent()?;
        } else if space_before && !self.buffer.is_empty() {
            write!(self.buffer, " ")?;
        }
        write!(self.buffer, "{text}")
    }

    /// Handle the token at `i`; returns how many tokens were consumed.
    fn visit(
        &mut self,
        tokens: &[Token<'_>],
        i: usize,
    ) -> std::result::Result<usize, std::fmt::Error> {
        let token = tokens[i];
        match token.kind {
            TokenKind::Word => return self.visit_word(tokens, i),
            TokenKind::Literal => self.write_token(token.text, token.space_before)?,
            TokenKind::LineComment => self.visit_comment(token.text, false)?,
            TokenKind::BlockComment => self.visit_comment(token.text, true)?,
            TokenKind::Open => self.open_paren(tokens, i)?,
            TokenKind::Close => self.close_paren(token)?,
            TokenKind::Comma => {
                self.write_token(",", token.space_before)?;
                let frame = self.top();
                if frame.inline == 0 && frame.list_commas {
                    let body = frame.body;
                    self.pending = Some(body);
                }
            }
            TokenKind::Semicolon => {
                self.write_token(";", token.space_before)?;
                self.pending = Some(0);
            }
        }
        Ok(1)
    }

    fn visit_comment(&mut self, text: &str, block: bool) -> Result {
        let indent = self.content_indent();
        if block && !self.buffer.is_empty() {
            self.blank_line = true;
        }
        self.pending = Some(indent);
        self.write_token(text, false)?;
        self.pending = Some(indent);
        self.blank_line = block;
        Ok(())
    }

    fn visit_word(
        &mut self,
        tokens: &[Token<'_>],
        i: usize,
    ) -> std::result::Result<usize, std::fmt::Error> {
        let token = tokens[i];
        let upper = token.text.to_ascii_uppercase();
        let frame = self.top().clone();

        if frame.inline == 0 {
            if let Some(phrase) = match_phrase(tokens, i) {
                let distinct_from = phrase.words == ["FROM"]
                    && i > 0
                    && tokens[i - 1].kind == TokenKind::Word
                    && tokens[i - 1].text.eq_ignore_ascii_case("distinct");
                if !distinct_from {
                    self.clause(phrase)?;
                    return Ok(phrase.words.len());
                }
            }

            match upper.as_str() {
                "CASE" => {
                    let indent = self.content_indent();
                    self.pending = Some(indent);
                    self.write_token("CASE", false)?;
                    let mut case = Frame::new(FrameKind::Case, indent, indent);
                    case.body = indent + 2;
                    self.frames.push(case);
                    return Ok(1);
                }
                "WHEN" | "ELSE" if frame.kind == FrameKind::Case => {
                    self.pending = Some(frame.base + 1);
                    self.write_token(&upper, false)?;
                    return Ok(1);
                }
                "END" if frame.kind == FrameKind::Case => {
                    self.pending = Some(frame.base);
                    self.write_token("END", false)?;
                    self.frames.pop();
                    return Ok(1);
                }
                _ => {}
            }
        }

        if KEYWORDS.contains(&upper.as_str()) {
            self.write_token(&upper, token.space_before)?;
        } else {
            self.write_token(token.text, token.space_before)?;
        }
        Ok(1)
    }

    fn clause(&mut self, phrase: &Phrase) -> Result {
        let base = self.top().base;
        self.pending = Some(base);
        self.write_token(&phrase.words.join(" "), false)?;

        let frame = self.top();
        frame.body = base + 1;
        frame.list_commas = phrase.lists;
        frame.create = phrase.words == ["CREATE"];
        if phrase.nests {
            self.pending = Some(base + 1);
        }
        Ok(())
    }

    fn open_paren(&mut self, tokens: &[Token<'_>], i: usize) -> Result {
        let token = tokens[i];
        let subquery = tokens[i + 1..]
            .iter()
            .find(|t| !matches!(t.kind, TokenKind::LineComment | TokenKind::BlockComment))
            .is_some_and(|t| {
                t.kind == TokenKind::Word
                    && (t.text.eq_ignore_ascii_case("select")
                        || t.text.eq_ignore_ascii_case("with"))
            });

        self.write_token("(", token.space_before)?;
        let indent = self.line_indent;
        let frame = self.top();

        if subquery {
            self.frames
                .push(Frame::new(FrameKind::Subquery, indent + 1, indent));
            self.groups.push(Group::Block(self.frames.len() - 1));
        } else if frame.inline == 0 && frame.create {
            frame.create = false;
            self.frames
                .push(Frame::new(FrameKind::Columns, indent + 1, indent));
            self.groups.push(Group::Block(self.frames.len() - 1));
            self.pending = Some(indent + 1);
        } else {
            frame.inline += 1;
            let owner = self.frames.len() - 1;
            self.groups.push(Group::Inline(owner));
        }
        Ok(())
    }

    fn close_paren(&mut self, token: Token<'_>) -> Result {
        match self.groups.pop() {
            Some(Group::Inline(owner)) => {
                self.frames.truncate(owner + 1);
                let frame = self.top();
                frame.inline = frame.inline.saturating_sub(1);
                self.write_token(")", token.space_before)
            }
            Some(Group::Block(index)) => {
                let close = self
                    .frames
                    .get(index)
                    .map_or(0, |frame| frame.close_indent);
                self.frames.truncate(index.max(1));
                self.pending = Some(close);
                self.write_token(")", false)
            }
            None => self.write_token(")", token.space_before),
        }
    }
}

/// Longest line-breaking phrase starting at `i`.
fn match_phrase(tokens: &[Token<'_>], i: usize) -> Option<&'static Phrase> {
    BREAKS.iter().find(|phrase| {
        phrase.words.iter().enumerate().all(|(k, word)| {
            tokens
                .get(i + k)
                .is_some_and(|t| t.kind == TokenKind::Word && t.text.eq_ignore_ascii_case(word))
        })
    })
}

/// Format one statement with the default indent width.
pub fn format_sql(sql: &str) -> SqlPortResult<String> {
    Formatter::new().format(sql)
}
